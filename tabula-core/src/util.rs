/// Writes every element of `values` through `f`, putting `separator` between
/// elements that actually produced output.
pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        format_args!(
            "{}{}",
            &$query[..::std::cmp::min($query.len(), 497)].trim_end(),
            if $query.len() > 497 { "..." } else { "" },
        )
    };
}

/// Builds a [`Conditions`](crate::Conditions) set from `column => value` pairs, keeping their order.
///
/// ```rust
/// use tabula_core::{Value, conditions};
/// let conditions = conditions! { "name" => "John", "score" => 30 };
/// assert_eq!(conditions.len(), 2);
/// assert_eq!(conditions.get("score"), Some(&Value::Int32(Some(30))));
/// ```
#[macro_export]
macro_rules! conditions {
    () => {
        $crate::Conditions::new()
    };
    ($($column:expr => $value:expr),+ $(,)?) => {{
        let mut conditions = $crate::Conditions::new();
        $(conditions.insert($column, $value);)+
        conditions
    }};
}
