/**
Provides a lisp-like syntax for constructing lists.

`,item` adds one element, `,@list` splices the elements of a list.

## Example

```rust
use schemer::{list, Object};

// Create a list with 3 values inside.
let list1 = list!(
    ,10.into()
    ,"hello".into()
    ,5.2.into()
);
assert_eq!(
    list1.to_string(),
    r#"(10 "hello" 5.2)"#
);

// Create a list that splices `list1` in the second pos.
let list2 = list!(
    ,20.into()
    ,@list1.clone()
    ,list1
    ,Object::symbol("world")
);
assert_eq!(
    list2.to_string(),
    r#"(20 10 "hello" 5.2 (10 "hello" 5.2) world)"#
);
```
*/
#[macro_export]
macro_rules! list {
    (@push $ret:ident, @ $item:expr) => {
        $ret.extend($item.base_iter())
    };
    (@push $ret:ident, $item:expr) => {
        $ret.push($item)
    };
    (@push $ret:ident, @ $item:expr, $($items:tt)+) => {
        list!(@push $ret, @ $item);
        list!(@push $ret, $($items)+)
    };
    (@push $ret:ident, $item:expr, $($items:tt)+) => {
        list!(@push $ret, $item);
        list!(@push $ret, $($items)+)
    };
    (, $($items:tt)+) => { list!($($items)+) };
    ($($items:tt)+) => {{
        let mut ret: Vec<$crate::Object> = vec![];
        list!(@push ret, $($items)+);
        ret.into_iter().collect::<$crate::Object>()
    }};
    () => { $crate::Object::nil() }
}

/**
Destructures lists and binds the components to separate symbols.

Has a syntax similar to emacs lisp defun parameters.  Must be used inside a
function returning `Result<_, schemer::Error>`.

## Example

```rust
use schemer::{destruct_bind, list, Object, Error};

fn main() -> Result<(), Error> {
    let list1 = list!(,10.into());
    destruct_bind!((num1 &optional str1 num2) = list1);

    assert_eq!(num1.as_int()?, 10);
    assert!(str1.null());
    assert!(num2.null());

    let list1 = list!(
        ,10.into()
        ,"hello".into()
        ,5.2.into()
        ,22.into()
        ,42.into()
    );
    destruct_bind!((num1 &optional str1 num2 &rest other) = list1);

    assert_eq!(num1.as_int()?, 10);
    assert_eq!(str1.as_string()?, "hello");
    assert_eq!(num2.try_float()?, 5.2);
    assert_eq!(other.to_string(), "(22 42)");

    Ok(())
}
 ```
*/
#[macro_export]
macro_rules! destruct_bind {
    (@reqr $vv:ident, $var:ident) => {
        let $var = $vv.car().map_err(|_| $crate::Error::invalid_form(
            concat!("missing argument: ", stringify!($var))
        ))?;
        let $vv = $vv.cdr()?;
    };
    (@reqr $vv:ident, $var:ident $($vars:tt)+) => {
        destruct_bind!(@reqr $vv, $var);
        destruct_bind!(@reqr $vv, $($vars)+);
    };
    (@reqr $vv:ident,) => {};
    (@no-rest $vv:ident) => {
        if !$vv.null() {
            return Err($crate::Error::invalid_form(format!("too many arguments: {}", $vv)));
        }
    };
    (@rest $rest:ident $vv:ident) => {
        let $rest = $vv;
    };
    (@optvar $vv:ident, $var:ident) => {
        let ($var, $vv) = if $vv.consp() {
            ($vv.car()?, $vv.cdr()?)
        } else {
            ($crate::Object::nil(), $crate::Object::nil())
        };
    };
    (@optvar $vv:ident, $var:ident $($vars:ident)+) => {
        destruct_bind!(@optvar $vv, $var);
        destruct_bind!(@optvar $vv, $($vars)+)
    };
    (@impl ($($vars:ident)+) = $vv:ident) => {
        destruct_bind!(@reqr $vv, $($vars)+);
        destruct_bind!(@no-rest $vv);
    };
    (@impl ($($vars:ident)* &optional $($optvars:ident)+) = $vv:ident) => {
        destruct_bind!(@reqr $vv, $($vars)*);
        destruct_bind!(@optvar $vv, $($optvars)+);
        destruct_bind!(@no-rest $vv);
    };
    (@impl ($($vars:ident)* &rest $rest:ident) = $vv:ident) => {
        destruct_bind!(@reqr $vv, $($vars)*);
        destruct_bind!(@rest $rest $vv);
    };
    (@impl ($($vars:ident)* &optional $($optvars:ident)+ &rest $rest:ident) = $vv:ident) => {
        destruct_bind!(@reqr $vv, $($vars)*);
        destruct_bind!(@optvar $vv, $($optvars)+);
        destruct_bind!(@rest $rest $vv);
    };
    (($($rest:tt)*) = $vv:ident) => {
        let __destruct = $vv.clone();
        destruct_bind!(@impl ($($rest)*) = __destruct);
    };
}
