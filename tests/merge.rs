use reqopt::{merge, merge_options, merged, Body, Map, Url, Value};

fn layers() -> (Map, Map, Map) {
    let a = Map::new()
        .with("method", "GET")
        .with("headers", Map::new().with("x-a", "1").with("x-shared", "a"))
        .with("retry", Map::new().with("limit", 2).with("backoff", Map::new().with("base", 100)));
    let b = Map::new()
        .with("headers", Map::new().with("x-b", "2").with("x-shared", "b"))
        .with("retry", Map::new().with("backoff", Map::new().with("factor", 2)));
    let c = Map::new()
        .with("method", "POST")
        .with("headers", Map::new().with("x-shared", Value::Unset))
        .with("throwHttpErrors", false);
    (a, b, c)
}

#[test]
fn merge_is_associative() {
    let (a, b, c) = layers();

    let all_at_once = merged([&a, &b, &c]);
    let stepwise = merged([&merged([&a, &b]), &c]);

    assert_eq!(all_at_once, stepwise);
}

#[test]
fn nested_maps_merge_recursively() {
    let (a, b, c) = layers();
    let out = merged([&a, &b, &c]);

    let headers = out.get("headers").and_then(Value::as_map).unwrap();
    assert_eq!(headers.get("x-a"), Some(&Value::from("1")));
    assert_eq!(headers.get("x-b"), Some(&Value::from("2")));
    assert_eq!(headers.get("x-shared"), Some(&Value::Unset));

    let backoff = out
        .get("retry")
        .and_then(Value::as_map)
        .and_then(|retry| retry.get("backoff"))
        .and_then(Value::as_map)
        .unwrap();
    assert_eq!(backoff.get("base"), Some(&Value::from(100)));
    assert_eq!(backoff.get("factor"), Some(&Value::from(2)));

    assert_eq!(out.get("method"), Some(&Value::from("POST")));
    assert_eq!(out.get("throwHttpErrors"), Some(&Value::Bool(false)));
}

#[test]
fn result_is_deep_copy() {
    let (a, b, _) = layers();
    let mut out = merged([&a, &b]);

    if let Some(Value::Map(headers)) = out.get_mut("headers") {
        headers.insert("x-a", "changed");
    }

    let original = a.get("headers").and_then(Value::as_map).unwrap();
    assert_eq!(original.get("x-a"), Some(&Value::from("1")));
    assert_eq!(a, layers().0);
    assert_eq!(b, layers().1);
}

#[test]
fn later_source_mutation_does_not_leak() {
    let (mut a, b, _) = layers();
    let out = merged([&a, &b]);
    let snapshot = out.clone();

    if let Some(Value::Map(headers)) = a.get_mut("headers") {
        headers.insert("x-a", "mutated");
        headers.insert("x-new", "added");
    }
    if let Some(Value::Map(retry)) = a.get_mut("retry") {
        if let Some(Value::Map(backoff)) = retry.get_mut("backoff") {
            backoff.insert("base", 1);
        }
    }

    assert_eq!(out, snapshot);
    let headers = out.get("headers").and_then(Value::as_map).unwrap();
    assert_eq!(headers.get("x-a"), Some(&Value::from("1")));
    assert!(!headers.contains_key("x-new"));
}

#[test]
fn merge_into_existing_target() {
    let (a, b, _) = layers();
    let mut target = Map::new().with("keep", true);

    merge(&mut target, [&a, &b]);

    assert_eq!(target.get("keep"), Some(&Value::Bool(true)));
    assert_eq!(target.get("method"), Some(&Value::from("GET")));
}

#[test]
fn relative_url_extends_base() {
    let base = Map::new().with("url", Url::parse("https://example.com/api/v1/").unwrap());

    let out = merged([&base, &Map::new().with("url", "users")]);
    assert_eq!(
        out.get("url").and_then(Value::as_url).map(Url::as_str),
        Some("https://example.com/api/v1/users")
    );

    let out = merged([&base, &Map::new().with("url", "https://other.example/x")]);
    assert_eq!(
        out.get("url").and_then(Value::as_url).map(Url::as_str),
        Some("https://other.example/x")
    );
}

#[test]
fn lists_replace_wholesale() {
    let a = Map::new().with("retry", Map::new().with("methods", vec!["GET", "PUT"]));
    let b = Map::new().with("retry", Map::new().with("methods", vec!["POST"]));

    let out = merged([&a, &b]);
    let methods = out
        .get("retry")
        .and_then(Value::as_map)
        .and_then(|retry| retry.get("methods"))
        .and_then(Value::as_list)
        .unwrap();
    assert_eq!(methods, &[Value::from("POST")][..]);
}

#[test]
fn bodies_are_shared_not_copied() {
    let body = Body::from("payload");
    let out = merged([&Map::new().with("body", body.clone())]);

    let merged_body = out.get("body").and_then(Value::as_body).unwrap();
    assert!(merged_body.ptr_eq(&body));
}

#[test]
fn unset_and_null_are_assigned_verbatim() {
    let a = Map::new().with("a", 1).with("b", 2);
    let b = Map::new().with("a", Value::Unset).with("b", Value::Null);

    let out = merged([&a, &b]);
    assert_eq!(out.get("a"), Some(&Value::Unset));
    assert_eq!(out.get("b"), Some(&Value::Null));
}

#[test]
fn header_names_collide_across_case() {
    let defaults = Map::new().with("headers", Map::new().with("User-Agent", "lib"));
    let instance = Map::new().with("headers", Map::new().with("USER-AGENT", "instance"));
    let call = Map::new().with("headers", Map::new().with("user-agent", "call"));

    let out = merge_options([&defaults, &instance, &call]);
    let headers = out.get("headers").and_then(Value::as_map).unwrap();

    assert_eq!(headers.len(), 1);
    assert_eq!(headers.get("user-agent"), Some(&Value::from("call")));
}

#[test]
fn unrecognized_fields_survive() {
    let a = Map::new().with("context", Map::new().with("token", "abc"));
    let b = Map::new().with("hooks", Map::new().with("beforeRetry", Vec::<Value>::new()));

    let out = merge_options([&a, &b]);
    assert!(out.contains_key("context"));
    assert!(out.contains_key("hooks"));
}
