//! URL fragment codec
//!
//! Pure conversions between the persisted fragment (`#key=value&key=value`)
//! and the in-memory [`SegmentMap`]. Key names and the `bbox` component order
//! are part of the deep-link format and must not change.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use mapsync_core::prelude::*;
use mapsync_core::{keys, BoundingBox, InitialSettings, SegmentMap, TimeBound};

/// Leading character of every fragment
pub const FRAGMENT_MARKER: char = '#';

/// `encodeURIComponent` set, except that `,` stays literal so coordinate
/// tuples remain readable in the address bar.
const SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b',');

/// Parse a fragment into the state record it describes.
///
/// Returns `None` for an empty string or one that does not start with `#`.
/// Pieces are split on the first `=`; a piece without one becomes a key with
/// an empty value. A repeated key keeps its first position and its last value.
pub fn parse(fragment: &str) -> Option<InitialSettings> {
    let body = fragment.strip_prefix(FRAGMENT_MARKER)?;

    let mut segments = SegmentMap::new();
    for piece in body.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = match piece.split_once('=') {
            Some((k, v)) => (k, v),
            None => {
                debug!("Fragment piece without '=': {:?}", piece);
                (piece, "")
            }
        };
        if let Some(prev) = segments.set(decode(key), decode(value)) {
            debug!("Repeated fragment key {:?}, dropping {:?}", key, prev);
        }
    }

    let bbox = segments.get(keys::BBOX).and_then(|raw| {
        let parsed = parse_bbox(raw);
        if parsed.is_none() {
            debug!("Ignoring malformed bbox segment {:?}", raw);
        }
        parsed
    });

    let from = segments
        .get(keys::FROM)
        .filter(|v| !v.is_empty())
        .map(parse_time_bound);
    let to = segments
        .get(keys::TO)
        .filter(|v| !v.is_empty())
        .map(parse_time_bound);

    Some(InitialSettings {
        segments,
        bbox,
        from,
        to,
    })
}

/// Serialize segments in insertion order, without sorting
pub fn serialize(segments: &SegmentMap) -> String {
    let mut out = String::from(FRAGMENT_MARKER);
    for (i, (key, value)) in segments.iter().enumerate() {
        if i > 0 {
            out.push('&');
        }
        out.extend(utf8_percent_encode(key, SEGMENT_ENCODE_SET));
        out.push('=');
        out.extend(utf8_percent_encode(value, SEGMENT_ENCODE_SET));
    }
    out
}

/// Parse a `bbox` value. Components come in the fixed order
/// `west,east,south,north`.
pub fn parse_bbox(value: &str) -> Option<BoundingBox> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .ok()?;

    match parts.as_slice() {
        [west, east, south, north, ..] => Some(BoundingBox {
            north: *north,
            south: *south,
            east: *east,
            west: *west,
        }),
        _ => None,
    }
}

/// Coerce a `from` / `to` value using the leading-integer rule: optional
/// whitespace, an optional sign, then digits. Trailing garbage is ignored.
pub fn parse_time_bound(value: &str) -> TimeBound {
    let trimmed = value.trim_start();
    let (sign_len, rest) = match trimmed.as_bytes().first() {
        Some(b'-') | Some(b'+') => (1, &trimmed[1..]),
        _ => (0, trimmed),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();

    if digits == 0 {
        return TimeBound::NotANumber(value.to_string());
    }

    trimmed[..sign_len + digits]
        .parse::<i64>()
        .map(TimeBound::Year)
        .unwrap_or_else(|_| TimeBound::NotANumber(value.to_string()))
}

fn decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_missing_marker() {
        assert!(parse("").is_none());
        assert!(parse("at=1,2,3").is_none());
        assert!(parse("?at=1,2,3").is_none());
    }

    #[test]
    fn test_parse_marker_only_is_empty_state() {
        let state = parse("#").unwrap();
        assert!(state.segments.is_empty());
        assert!(state.bbox.is_none());
    }

    #[test]
    fn test_parse_basic_segments_in_order() {
        let state = parse("#at=41.9,12.5,7&query=rome&layer=osm").unwrap();
        let keys: Vec<_> = state.segments.keys().collect();
        assert_eq!(keys, vec!["at", "query", "layer"]);
        assert_eq!(state.segments.get("at"), Some("41.9,12.5,7"));
        assert_eq!(state.query(), Some("rome"));
    }

    #[test]
    fn test_parse_decodes_keys_and_values() {
        let state = parse("#places=place%2F42&query=via%20appia").unwrap();
        assert_eq!(state.segments.get("places"), Some("place/42"));
        assert_eq!(state.segments.get("query"), Some("via appia"));
    }

    #[test]
    fn test_parse_splits_on_first_equals() {
        let state = parse("#query=a=b").unwrap();
        assert_eq!(state.segments.get("query"), Some("a=b"));
    }

    #[test]
    fn test_parse_piece_without_equals() {
        let state = parse("#ex&f=open").unwrap();
        assert_eq!(state.segments.get("ex"), Some(""));
        assert_eq!(state.segments.get("f"), Some("open"));
    }

    #[test]
    fn test_parse_repeated_key_last_wins() {
        let state = parse("#layer=osm&at=1,2,3&layer=dare").unwrap();
        assert_eq!(state.segments.get("layer"), Some("dare"));
        assert_eq!(state.segments.keys().collect::<Vec<_>>(), vec!["layer", "at"]);
    }

    #[test]
    fn test_parse_bbox_order() {
        let state = parse("#bbox=3,5,9.5,10.5").unwrap();
        assert_eq!(
            state.bbox,
            Some(BoundingBox {
                west: 3.0,
                east: 5.0,
                south: 9.5,
                north: 10.5,
            })
        );
        // Raw segment stays available
        assert_eq!(state.segments.get("bbox"), Some("3,5,9.5,10.5"));
    }

    #[test]
    fn test_parse_malformed_bbox() {
        let state = parse("#bbox=3,5,nine").unwrap();
        assert!(state.bbox.is_none());
        assert_eq!(state.segments.get("bbox"), Some("3,5,nine"));
    }

    #[test]
    fn test_parse_coerces_timespan() {
        let state = parse("#from=-500&to=200").unwrap();
        assert_eq!(state.from, Some(TimeBound::Year(-500)));
        assert_eq!(state.to, Some(TimeBound::Year(200)));
        assert_eq!(state.segments.get("from"), Some("-500"));
    }

    #[test]
    fn test_parse_non_numeric_timespan() {
        let state = parse("#from=abc&to=").unwrap();
        assert_eq!(state.from, Some(TimeBound::NotANumber("abc".to_string())));
        assert_eq!(state.to, None);
    }

    #[test]
    fn test_parse_time_bound_leading_integer() {
        assert_eq!(parse_time_bound("12ab"), TimeBound::Year(12));
        assert_eq!(parse_time_bound("  +7"), TimeBound::Year(7));
        assert_eq!(parse_time_bound("-"), TimeBound::NotANumber("-".to_string()));
        assert_eq!(
            parse_time_bound("99999999999999999999"),
            TimeBound::NotANumber("99999999999999999999".to_string())
        );
    }

    #[test]
    fn test_serialize_insertion_order_without_sorting() {
        let segments: SegmentMap = [("query", "rome"), ("at", "41.9,12.5,7")]
            .into_iter()
            .collect();
        assert_eq!(serialize(&segments), "#query=rome&at=41.9,12.5,7");
    }

    #[test]
    fn test_serialize_encodes_identifiers() {
        let segments: SegmentMap = [("places", "place/42")].into_iter().collect();
        assert_eq!(serialize(&segments), "#places=place%2F42");

        let segments: SegmentMap = [("query", "a&b=c d")].into_iter().collect();
        assert_eq!(serialize(&segments), "#query=a%26b%3Dc%20d");
    }

    #[test]
    fn test_serialize_empty() {
        assert_eq!(serialize(&SegmentMap::new()), "#");
    }

    #[test]
    fn test_round_trip() {
        let segments: SegmentMap = [
            ("at", "10.00000000,4.00000000,7"),
            ("query", "temple of \"Jupiter\" & co"),
            ("from", "-500"),
            ("to", "200"),
            ("layer", "dare"),
            ("places", "http://pleiades.stoa.org/places/423025"),
            ("f", "open"),
            ("ex", "true"),
        ]
        .into_iter()
        .collect();

        let state = parse(&serialize(&segments)).unwrap();
        assert_eq!(state.segments, segments);
        assert_eq!(state.from, Some(TimeBound::Year(-500)));
        assert_eq!(state.to, Some(TimeBound::Year(200)));
    }
}
