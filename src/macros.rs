/// Builds a [`Value`](crate::Value) from JSON-like syntax.
///
/// Keys are string literals and keep their written order. Any other Rust
/// expression is converted with `Value::from`; wrap field accesses and
/// method calls in parentheses.
///
/// ```rust
/// use freezedry::value;
///
/// let limit = 10;
/// let query = value!({
///     "table": "users",
///     "limit": (limit * 2),
///     "filters": [null, true, -1.5, undefined],
///     "nested": {},
/// });
/// assert_eq!(query.get("limit").unwrap().as_i64(), Some(20));
/// ```
#[macro_export]
macro_rules! value {
    // Array elements, accumulated into a Vec.
    (@array [$($elems:expr,)*]) => {
        ::std::vec![$($elems,)*]
    };

    (@array [$($elems:expr,)*] undefined $($rest:tt)*) => {
        $crate::value!(@array [$($elems,)* $crate::Value::Undefined,] $($rest)*)
    };

    (@array [$($elems:expr,)*] null $($rest:tt)*) => {
        $crate::value!(@array [$($elems,)* $crate::Value::Null,] $($rest)*)
    };

    (@array [$($elems:expr,)*] [$($array:tt)*] $($rest:tt)*) => {
        $crate::value!(@array [$($elems,)* $crate::value!([$($array)*]),] $($rest)*)
    };

    (@array [$($elems:expr,)*] {$($object:tt)*} $($rest:tt)*) => {
        $crate::value!(@array [$($elems,)* $crate::value!({$($object)*}),] $($rest)*)
    };

    (@array [$($elems:expr,)*] $next:expr, $($rest:tt)*) => {
        $crate::value!(@array [$($elems,)* $crate::value!($next),] $($rest)*)
    };

    (@array [$($elems:expr,)*] $last:expr) => {
        $crate::value!(@array [$($elems,)* $crate::value!($last),])
    };

    (@array [$($elems:expr,)*] , $($rest:tt)*) => {
        $crate::value!(@array [$($elems,)*] $($rest)*)
    };

    // Object fields, inserted one at a time.
    (@object $record:ident ()) => {};

    (@object $record:ident ($key:literal : undefined $(, $($rest:tt)*)?)) => {
        $record.insert($key, $crate::Value::Undefined);
        $crate::value!(@object $record ($($($rest)*)?));
    };

    (@object $record:ident ($key:literal : null $(, $($rest:tt)*)?)) => {
        $record.insert($key, $crate::Value::Null);
        $crate::value!(@object $record ($($($rest)*)?));
    };

    (@object $record:ident ($key:literal : [$($array:tt)*] $(, $($rest:tt)*)?)) => {
        $record.insert($key, $crate::value!([$($array)*]));
        $crate::value!(@object $record ($($($rest)*)?));
    };

    (@object $record:ident ($key:literal : {$($object:tt)*} $(, $($rest:tt)*)?)) => {
        $record.insert($key, $crate::value!({$($object)*}));
        $crate::value!(@object $record ($($($rest)*)?));
    };

    (@object $record:ident ($key:literal : $value:expr $(, $($rest:tt)*)?)) => {
        $record.insert($key, $crate::value!($value));
        $crate::value!(@object $record ($($($rest)*)?));
    };

    (undefined) => {
        $crate::Value::Undefined
    };

    (null) => {
        $crate::Value::Null
    };

    ([]) => {
        $crate::Value::array(::std::vec::Vec::new())
    };

    ([ $($tt:tt)+ ]) => {
        $crate::Value::array($crate::value!(@array [] $($tt)+))
    };

    ({}) => {
        $crate::Value::object($crate::Record::new())
    };

    ({ $($tt:tt)+ }) => {{
        let mut record = $crate::Record::new();
        $crate::value!(@object record ($($tt)+));
        $crate::Value::object(record)
    }};

    ($other:expr) => {
        $crate::Value::from($other)
    };
}
