// ── NVRAM dump parser ──
//
// Turns `nvram show` output into an `Nvram` snapshot. Stdout carries one
// `name=value` per line; stderr carries the `size: N bytes (M left)`
// usage line.

use std::sync::LazyLock;

use chrono::{DateTime, Local};
use regex::Regex;
use tracing::debug;

use crate::defaults::FirmwareDefaults;
use crate::error::CoreError;
use crate::model::{Nvram, NvramUsage, SixTuple, TripleTuple, Variable, VariableKind};

/// Notification-center settings, encoded as `<a>b>c>` triples.
pub const NC_SETTING_CONF: &str = "nc_setting_conf";
/// Client names/icons, encoded as `<name>mac>x>y>z>w>` sextuples.
pub const CUSTOM_CLIENTLIST: &str = "custom_clientlist";

static USAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"size:\s(\d+)\sbytes\s\((\d+)\sleft\)").expect("usage pattern is valid")
});

/// Extract capacity figures from the dump's stderr. Absent or
/// unparseable figures are zero.
pub fn parse_usage(stderr: &str) -> NvramUsage {
    let Some(caps) = USAGE_RE.captures(stderr) else {
        return NvramUsage::default();
    };
    let number = |i: usize| {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };
    NvramUsage {
        total_bytes: number(1),
        remaining_bytes: number(2),
    }
}

/// Parse a full dump into a snapshot stamped with `retrieved_at`.
pub fn parse_dump(
    stdout: &str,
    stderr: &str,
    defaults: &FirmwareDefaults,
    retrieved_at: DateTime<Local>,
) -> Result<Nvram, CoreError> {
    let mut variables = Vec::new();

    for line in stdout.lines() {
        let Some((name, value)) = line.split_once('=') else {
            continue;
        };
        if name.is_empty() {
            debug!(line, "skipping dump line with empty name");
            continue;
        }
        variables.push(parse_variable(name, value, defaults)?);
    }

    Ok(Nvram::new(variables, parse_usage(stderr), retrieved_at))
}

/// Build one variable, dispatching reserved names to the tuple decoders.
pub fn parse_variable(
    name: &str,
    value: &str,
    defaults: &FirmwareDefaults,
) -> Result<Variable, CoreError> {
    let kind = match name {
        NC_SETTING_CONF => VariableKind::TripleTuple(decode_triples(name, value)?),
        CUSTOM_CLIENTLIST => VariableKind::SixTuple(decode_sextuples(name, value)?),
        _ => VariableKind::Plain,
    };
    Ok(Variable::new(
        name,
        value,
        kind,
        defaults.description(name),
        defaults.default_value(name),
    ))
}

pub fn decode_triples(name: &str, value: &str) -> Result<Vec<TripleTuple>, CoreError> {
    decode_records::<3>(name, value).map(|records| {
        records
            .into_iter()
            .map(|[a, b, c]| (a, b, c))
            .collect()
    })
}

pub fn decode_sextuples(name: &str, value: &str) -> Result<Vec<SixTuple>, CoreError> {
    decode_records::<6>(name, value)
}

/// Split on `<`, drop blank segments, split each on `>` and keep the
/// first `N` fields. A segment with fewer than `N` fields is rejected.
fn decode_records<const N: usize>(name: &str, value: &str) -> Result<Vec<[String; N]>, CoreError> {
    value
        .split('<')
        .filter(|segment| !segment.trim().is_empty())
        .map(|segment| {
            let fields: Vec<&str> = segment.split('>').collect();
            if fields.len() < N {
                return Err(CoreError::MalformedVariable {
                    name: name.to_owned(),
                    segment: segment.to_owned(),
                    expected: N,
                    found: fields.len(),
                });
            }
            Ok(std::array::from_fn(|i| fields[i].to_owned()))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn table() -> FirmwareDefaults {
        FirmwareDefaults::from_json(
            r#"{"sw_mode": {"default": "1", "description": "big switch for different mode"}}"#,
        )
        .unwrap()
    }

    #[test]
    fn usage_line_is_extracted() {
        let usage = parse_usage("size: 65536 bytes (1234 left)");
        assert_eq!(usage.total_bytes, 65_536);
        assert_eq!(usage.remaining_bytes, 1_234);
    }

    #[test]
    fn usage_defaults_to_zero() {
        assert_eq!(parse_usage(""), NvramUsage::default());
        assert_eq!(parse_usage("size: lots (some left)"), NvramUsage::default());
    }

    #[test]
    fn usage_found_among_other_stderr() {
        let usage = parse_usage("warning: something\nsize: 131072 bytes (40960 left)\n");
        assert_eq!(usage.used_bytes(), 90_112);
    }

    #[test]
    fn nc_setting_conf_decodes_triples() {
        let var = parse_variable(NC_SETTING_CONF, "<a>b>c><d>e>f>", &table()).unwrap();
        assert_eq!(
            var.kind(),
            &VariableKind::TripleTuple(vec![
                ("a".into(), "b".into(), "c".into()),
                ("d".into(), "e".into(), "f".into()),
            ])
        );
        assert!(var.is_special());
    }

    #[test]
    fn custom_clientlist_decodes_sextuples() {
        let var = parse_variable(
            CUSTOM_CLIENTLIST,
            "<Phone>AA:BB:CC:DD:EE:FF>0>10>>",
            &table(),
        )
        .unwrap();
        let VariableKind::SixTuple(records) = var.kind() else {
            panic!("expected six-tuples, got {:?}", var.kind());
        };
        assert_eq!(records.len(), 1);
        assert_eq!(records[0][0], "Phone");
        assert_eq!(records[0][1], "AA:BB:CC:DD:EE:FF");
        assert_eq!(records[0][3], "10");
        assert_eq!(records[0][5], "");
    }

    #[test]
    fn short_segment_is_rejected() {
        let err = parse_variable(NC_SETTING_CONF, "<a>b>c><d>e", &table()).unwrap_err();
        match err {
            CoreError::MalformedVariable {
                name,
                segment,
                expected,
                found,
            } => {
                assert_eq!(name, NC_SETTING_CONF);
                assert_eq!(segment, "d>e");
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn blank_segments_are_skipped() {
        let records = decode_triples(NC_SETTING_CONF, " < <a>b>c>").unwrap();
        assert_eq!(records, vec![("a".into(), "b".into(), "c".into())]);
        assert!(decode_triples(NC_SETTING_CONF, "").unwrap().is_empty());
    }

    #[test]
    fn dump_splits_on_first_equals_and_skips_noise() {
        let stdout = "sw_mode=1\nnot a variable\nhttp_passwd=a=b=c\r\nempty=\n=orphan\n";
        let nvram = parse_dump(
            stdout,
            "size: 100 bytes (50 left)",
            &table(),
            Local::now(),
        )
        .unwrap();

        let names: Vec<&str> = nvram.variables().iter().map(Variable::name).collect();
        assert_eq!(names, vec!["sw_mode", "http_passwd", "empty"]);

        let passwd = nvram.get("http_passwd").unwrap();
        assert_eq!(passwd.original_value(), "a=b=c");
        assert_eq!(passwd.size_bytes(), 5);
        assert_eq!(nvram.get("empty").unwrap().size_bytes(), 0);
        assert_eq!(nvram.total_size_bytes(), 100);
        assert_eq!(nvram.remaining_size_bytes(), 50);
    }

    #[test]
    fn reference_metadata_is_attached() {
        let nvram = parse_dump("sw_mode=3\nmystery=x\n", "", &table(), Local::now()).unwrap();
        let sw = nvram.get("sw_mode").unwrap();
        assert_eq!(sw.description(), "big switch for different mode");
        assert_eq!(sw.default_value(), "1");

        let mystery = nvram.get("mystery").unwrap();
        assert_eq!(mystery.description(), "Unknown");
        assert_eq!(mystery.default_value(), "Unknown");
    }

    #[test]
    fn malformed_tuple_fails_whole_dump() {
        let result = parse_dump("nc_setting_conf=<oops\n", "", &table(), Local::now());
        assert!(matches!(result, Err(CoreError::MalformedVariable { .. })));
    }
}
