/*!
The built in special forms and host functions.

## Special forms

Special forms receive their arguments unevaluated.  Their names are reserved
in the head position of a form, and each name is also bound in the global
environment to a marker, so that `(define my-if if)` makes `my-if` behave like
`if`.

| Name            | Usage                                  | Details                                       |
|-----------------|----------------------------------------|-----------------------------------------------|
| `lambda`        | `(lambda params body...)`              | `params` is a list, a dotted list or a symbol |
| `if`            | `(if test then [else])`                | only `#f` is false; no `else` returns `()`    |
| `define`        | `(define name expr)`                   | also `(define (name params...) body...)`      |
| `set!`          | `(set! name expr)`                     | creates a global binding if `name` is unbound |
| `quote`         | `(quote datum)`                        | same as `'datum`                              |
| `str-quote`     | `(str-quote expr)`                     | the printed value of `expr` as a string       |
| `define-syntax` | `(define-syntax name (syntax-rules ...))` |                                            |
| `host-func`     | `(host-func name args...)`             | calls a host function by name                 |
| `host-ref`      | `(host-ref name)`                      | returns a callable host function marker       |
| `cons`          | `(cons a b)`                           |                                               |
| `car`           | `(car pair)`                           |                                               |
| `cdr`           | `(cdr pair)`                           |                                               |
| `null?`         | `(null? x)`                            |                                               |
| `apply`         | `(apply f list)`                       |                                               |

## Host functions

Bound in the global environment as host function markers.  Called through the
foreign call boundary with marshalled arguments.

| Name                       | Details                                               |
|----------------------------|-------------------------------------------------------|
| `+` `-` `*` `/` `%`        | integer results when all operands are integers         |
| `=` `<` `>` `<=` `>=`      | compares each adjacent pair of arguments               |
| `display`                  | prints its arguments, strings without quotes           |
| `newline`                  | prints a newline                                       |
*/

pub mod host;
pub mod special_forms;
