//! `--op` argument parsing: `KIND[:key=value,...]`.

use retouch_pipeline::{ParamValue, Params};

/// One `--op` argument.
#[derive(Debug, Clone, PartialEq)]
pub struct OpSpec {
    pub kind: String,
    pub params: Params,
}

/// Parse `KIND[:key=value,...]`.
///
/// Values are read as `true`/`false`, then integers, then floats, and
/// anything else is kept as text.
pub fn parse(arg: &str) -> Result<OpSpec, String> {
    let (kind, rest) = arg.split_once(':').unwrap_or((arg, ""));
    let kind = kind.trim();
    if kind.is_empty() {
        return Err(format!("missing operation kind in {arg:?}"));
    }

    let mut params = Params::new();
    for pair in rest.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got {pair:?}"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("empty parameter name in {pair:?}"));
        }
        params.insert(key, parse_value(value.trim()));
    }

    Ok(OpSpec {
        kind: kind.to_owned(),
        params,
    })
}

fn parse_value(value: &str) -> ParamValue {
    if let Ok(flag) = value.parse::<bool>() {
        ParamValue::Bool(flag)
    } else if let Ok(int) = value.parse::<i64>() {
        ParamValue::Int(int)
    } else if let Ok(float) = value.parse::<f64>() {
        ParamValue::Float(float)
    } else {
        ParamValue::Text(value.to_owned())
    }
}
