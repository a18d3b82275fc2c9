// xor-shift
pub(crate) fn fast_random() -> u64 {
    use std::cell::Cell;
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};
    use std::num::Wrapping;

    thread_local! {
        static RNG: Cell<Wrapping<u64>> = Cell::new(Wrapping(seed()));
    }

    fn seed() -> u64 {
        let seed = RandomState::new();

        let mut out = 0;
        let mut cnt = 0;
        while out == 0 {
            cnt += 1;
            let mut hasher = seed.build_hasher();
            hasher.write_usize(cnt);
            out = hasher.finish();
        }
        out
    }

    RNG.with(|rng| {
        let mut n = rng.get();
        debug_assert_ne!(n.0, 0);
        n ^= n >> 12;
        n ^= n << 25;
        n ^= n >> 27;
        rng.set(n);
        n.0.wrapping_mul(0x2545_f491_4f6c_dd1d)
    })
}

/// Lower-cases every key of a `headers` map, last write winning on collision.
pub(crate) fn fold_header_names(headers: &crate::Map) -> crate::Map {
    headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
        .collect()
}

/// Methods for which an empty body is still announced with `content-length: 0`.
#[inline]
pub(crate) fn method_has_defined_payload_semantics(method: &http::Method) -> bool {
    !matches!(
        *method,
        http::Method::GET
            | http::Method::HEAD
            | http::Method::DELETE
            | http::Method::CONNECT
            | http::Method::OPTIONS
            | http::Method::TRACE
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Map, Value};

    #[test]
    fn fold_last_write_wins() {
        let headers = Map::new()
            .with("User-Agent", "a")
            .with("user-agent", Value::Unset)
            .with("X-Id", "1");
        let folded = fold_header_names(&headers);
        assert_eq!(folded.keys().collect::<Vec<_>>(), ["user-agent", "x-id"]);
        assert_eq!(folded.get("user-agent"), Some(&Value::Unset));
    }

    #[test]
    fn payload_semantics() {
        assert!(method_has_defined_payload_semantics(&http::Method::PUT));
        assert!(method_has_defined_payload_semantics(&http::Method::POST));
        assert!(method_has_defined_payload_semantics(&http::Method::PATCH));
        assert!(!method_has_defined_payload_semantics(&http::Method::GET));
        assert!(!method_has_defined_payload_semantics(&http::Method::HEAD));
    }

    #[test]
    fn random_is_not_constant() {
        assert_ne!(fast_random(), fast_random());
    }
}
