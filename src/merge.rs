//! Recursive merging of options bags.

use std::borrow::Borrow;

use log::debug;

use crate::value::{Map, Value};

/// Merges each source into `target`, left to right, and returns `target`.
///
/// Later sources override earlier ones and the target itself. Per field:
///
/// - a string merged onto a URL is resolved as a relative reference against
///   it, so absolute strings replace the URL and relative ones extend it;
/// - a map is merged recursively into a fresh map, on top of the target's
///   map when there is one, so neither input's nested storage is reused;
/// - a list replaces the target's value wholesale;
/// - anything else, sentinels included, is assigned as is.
///
/// Fields present only in `target` are left untouched. Pass an empty map as
/// the target to leave every input unmodified.
///
/// ```
/// use reqopt::{merge, Map, Url, Value};
///
/// let base = Map::new().with("url", Url::parse("http://h/a").unwrap());
/// let call = Map::new().with("url", "b");
///
/// let mut merged = Map::new();
/// merge(&mut merged, [&base, &call]);
/// assert_eq!(merged.get("url").and_then(Value::as_url).unwrap().as_str(), "http://h/b");
/// ```
pub fn merge<I>(target: &mut Map, sources: I) -> &mut Map
where
    I: IntoIterator,
    I::Item: Borrow<Map>,
{
    for source in sources {
        for (key, source_value) in source.borrow().iter() {
            let merged = merge_value(target.get(key), source_value);
            target.insert(key, merged);
        }
    }
    target
}

/// Merges `sources` into a new map.
pub fn merged<I>(sources: I) -> Map
where
    I: IntoIterator,
    I::Item: Borrow<Map>,
{
    let mut target = Map::new();
    merge(&mut target, sources);
    target
}

fn merge_value(target: Option<&Value>, source: &Value) -> Value {
    match (target, source) {
        (Some(Value::Url(base)), Value::String(reference)) => match base.join(reference) {
            Ok(url) => Value::Url(url),
            Err(err) => {
                debug!("cannot resolve {reference:?} against {base}: {err}");
                Value::String(reference.clone())
            }
        },
        (Some(Value::Map(target)), Value::Map(source)) => Value::Map(merged([target, source])),
        (_, Value::Map(source)) => Value::Map(merged([source])),
        (_, Value::List(items)) => Value::List(items.to_vec()),
        (_, value) => value.clone(),
    }
}
