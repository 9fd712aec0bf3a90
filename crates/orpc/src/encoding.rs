//! Wire encoding helpers
//!
//! JSON bodies where an empty payload means "no value", strict
//! percent-decoding of path segments and query strings, and encoding of
//! path segments for outbound URLs.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde_json::{Map, Value};

/// Characters escaped in a URI component: everything except
/// `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Parse a JSON body where an empty payload means "no value".
pub fn parse_emptyable_json(bytes: &[u8]) -> Result<Option<Value>, serde_json::Error> {
    if bytes.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(bytes).map(Some)
}

/// Serialize an optional value, writing nothing for `None`.
pub fn stringify_emptyable_json(value: Option<&Value>) -> Result<Vec<u8>, serde_json::Error> {
    match value {
        Some(value) => serde_json::to_vec(value),
        None => Ok(Vec::new()),
    }
}

/// Strictly percent-decode a URI component.
///
/// Returns `None` for a `%` not followed by two hex digits or for a decoded
/// byte sequence that is not UTF-8.
pub fn decode_component(component: &str) -> Option<String> {
    let bytes = component.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit);
            if !valid {
                return None;
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    percent_decode_str(component)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

/// Percent-encode a URI component.
pub fn encode_component(component: &str) -> String {
    utf8_percent_encode(component, COMPONENT).to_string()
}

/// Split a URL path into decoded segments, ignoring one leading and one
/// trailing slash.
///
/// Returns `None` if any segment fails to decode.
pub fn decode_path_segments(path: &str) -> Option<Vec<String>> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    trimmed.split('/').map(decode_component).collect()
}

/// Parse `a=1&b=two` into a JSON object of strings.
///
/// Pairs with an empty key are skipped; a later duplicate key wins. In form
/// mode `+` decodes to a space, as in `application/x-www-form-urlencoded`.
/// Pairs that fail to decode are skipped.
pub fn parse_query(query: &str, form: bool) -> Map<String, Value> {
    let mut map = Map::new();
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key.is_empty() {
            continue;
        }

        let decode = |s: &str| {
            if form {
                decode_component(&s.replace('+', " "))
            } else {
                decode_component(s)
            }
        };

        if let (Some(key), Some(value)) = (decode(key), decode(value)) {
            map.insert(key, Value::String(value));
        }
    }
    map
}

/// Encode a JSON object as a query string.
///
/// Strings are written verbatim, `null` values are skipped, and other values
/// are written as JSON text.
pub fn encode_query(query: &Map<String, Value>) -> String {
    query
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{}={}", encode_component(key), encode_component(&value))
        })
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_emptyable_json() {
        assert_eq!(parse_emptyable_json(b"").unwrap(), None);
        assert_eq!(parse_emptyable_json(b"null").unwrap(), Some(Value::Null));
        assert_eq!(
            parse_emptyable_json(br#"{"a":1}"#).unwrap(),
            Some(json!({ "a": 1 }))
        );
        assert!(parse_emptyable_json(b"{").is_err());
        assert!(stringify_emptyable_json(None).unwrap().is_empty());
    }

    #[test]
    fn test_decode_component() {
        assert_eq!(decode_component("hello%20world").as_deref(), Some("hello world"));
        assert_eq!(decode_component("caf%C3%A9").as_deref(), Some("café"));
        assert_eq!(decode_component("plain").as_deref(), Some("plain"));
        assert_eq!(decode_component("%E0%A4%A"), None);
        assert_eq!(decode_component("%zz"), None);
        assert_eq!(decode_component("%"), None);
        assert_eq!(decode_component("%FF"), None);
    }

    #[test]
    fn test_encode_component_matches_uri_component_rules() {
        assert_eq!(encode_component("a b/c?d"), "a%20b%2Fc%3Fd");
        assert_eq!(encode_component("-_.!~*'()"), "-_.!~*'()");
        assert_eq!(encode_component("é"), "%C3%A9");
    }

    #[test]
    fn test_decode_path_segments() {
        assert_eq!(
            decode_path_segments("/planet/find/").unwrap(),
            vec!["planet", "find"]
        );
        assert_eq!(
            decode_path_segments("/a%2Fb/c").unwrap(),
            vec!["a/b", "c"]
        );
        assert!(decode_path_segments("/bad%").is_none());
    }

    #[test]
    fn test_parse_query() {
        let query = parse_query("a=1&b=hello%20there&c&=x&a=2", false);
        assert_eq!(
            Value::Object(query),
            json!({ "a": "2", "b": "hello there", "c": "" })
        );

        let form = parse_query("name=Pluto+Dwarf", true);
        assert_eq!(form["name"], "Pluto Dwarf");
    }

    #[test]
    fn test_encode_query() {
        let mut query = Map::new();
        query.insert("q".into(), json!("a b"));
        query.insert("limit".into(), json!(10));
        query.insert("skip".into(), Value::Null);
        assert_eq!(encode_query(&query), "limit=10&q=a%20b");
    }
}
