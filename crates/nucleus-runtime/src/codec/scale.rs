//! SCALE encoding of JSON values.
//!
//! Integers are little-endian; lengths and `Compact` values use the compact
//! prefix encoding. 128-bit integers decode to decimal strings, byte strings
//! and hashes to `0x` hex.

use serde_json::{Map, Value};
use std::borrow::Cow;

use super::CodecError;
use super::model::{CodecDef, Primitive};

/// Nesting limit for encoding and decoding, counting lazy reference hops.
pub const MAX_DEPTH: usize = 128;

/// Longest sequence of zero-size items accepted when decoding.
pub const MAX_ZERO_SIZE_ITEMS: usize = 1 << 16;

/// Resolves lazy codec references by name.
pub trait CodecLookup {
    /// Returns the codec registered under `name`, instantiated with `args`.
    ///
    /// # Errors
    ///
    /// Returns error if the name is unknown or the arguments do not fit.
    fn resolve(&self, name: &str, args: &[CodecDef]) -> Result<CodecDef, CodecError>;
}

/// Encodes `value` with `def`.
///
/// # Errors
///
/// Returns error if the value does not match the codec's shape or range.
pub fn encode(
    def: &CodecDef,
    value: &Value,
    lookup: &dyn CodecLookup,
) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    Scale { lookup }.encode(def, value, &mut out, 0)?;
    Ok(out)
}

/// Decodes `bytes` with `def`; the whole input must be consumed.
///
/// # Errors
///
/// Returns error on truncated, malformed or trailing input.
pub fn decode(def: &CodecDef, bytes: &[u8], lookup: &dyn CodecLookup) -> Result<Value, CodecError> {
    let mut input = bytes;
    let value = Scale { lookup }.decode(def, &mut input, 0)?;
    if input.is_empty() {
        Ok(value)
    } else {
        Err(CodecError::TrailingBytes(input.len()))
    }
}

struct Scale<'a> {
    lookup: &'a dyn CodecLookup,
}

impl Scale<'_> {
    /// Follows lazy references until a structural codec is reached.
    fn concrete<'d>(&self, def: &'d CodecDef, depth: usize) -> Result<Cow<'d, CodecDef>, CodecError> {
        let mut current = Cow::Borrowed(def);
        let mut hops = depth;
        while let CodecDef::Ref { name, args } = current.as_ref() {
            hops += 1;
            if hops > MAX_DEPTH {
                return Err(CodecError::TooDeep(MAX_DEPTH));
            }
            current = Cow::Owned(self.lookup.resolve(name, args)?);
        }
        Ok(current)
    }

    fn encode(
        &self,
        def: &CodecDef,
        value: &Value,
        out: &mut Vec<u8>,
        depth: usize,
    ) -> Result<(), CodecError> {
        if depth > MAX_DEPTH {
            return Err(CodecError::TooDeep(MAX_DEPTH));
        }
        let next = depth + 1;

        match def {
            CodecDef::Primitive(primitive) => encode_primitive(*primitive, value, out),
            CodecDef::Null => Ok(()),
            CodecDef::Struct(fields) => {
                let object = expect_object(value, def)?;
                for (name, field) in fields {
                    let field_value = object.get(name).ok_or_else(|| CodecError::InvalidValue {
                        codec: def.to_string(),
                        message: format!("missing field '{name}'"),
                    })?;
                    self.encode(field, field_value, out, next)?;
                }
                Ok(())
            }
            CodecDef::Enum(variants) => {
                let (variant, payload) = match value {
                    Value::String(name) => (name.as_str(), &Value::Null),
                    Value::Object(map) if map.len() == 1 => {
                        let (name, payload) = map.iter().next().ok_or_else(|| invalid(def, "empty variant object"))?;
                        (name.as_str(), payload)
                    }
                    _ => return Err(invalid(def, "expected a variant name or { Variant: payload }")),
                };
                let index = variants
                    .get_index_of(variant)
                    .ok_or_else(|| invalid(def, &format!("unknown variant '{variant}'")))?;
                let index = u8::try_from(index).map_err(|_| invalid(def, "more than 256 variants"))?;
                out.push(index);
                self.encode(&variants[usize::from(index)], payload, out, next)
            }
            CodecDef::Vec(elem) => {
                if let Some(bytes) = self.byte_string(elem, value, depth)? {
                    encode_compact(len_u128(bytes.len()), out);
                    out.extend_from_slice(&bytes);
                    return Ok(());
                }
                let items = expect_array(value, def)?;
                encode_compact(len_u128(items.len()), out);
                for item in items {
                    self.encode(elem, item, out, next)?;
                }
                Ok(())
            }
            CodecDef::Option(inner) => {
                let is_bool = matches!(
                    self.concrete(inner, depth)?.as_ref(),
                    CodecDef::Primitive(Primitive::Bool)
                );
                match (value, is_bool) {
                    (Value::Null, _) => out.push(0),
                    (Value::Bool(flag), true) => out.push(if *flag { 1 } else { 2 }),
                    (_, true) => return Err(invalid(def, "expected a boolean or null")),
                    (some, false) => {
                        out.push(1);
                        self.encode(inner, some, out, next)?;
                    }
                }
                Ok(())
            }
            CodecDef::Result(ok, err) => {
                let object = expect_object(value, def)?;
                match (object.get("Ok"), object.get("Err")) {
                    (Some(payload), None) => {
                        out.push(0);
                        self.encode(ok, payload, out, next)
                    }
                    (None, Some(payload)) => {
                        out.push(1);
                        self.encode(err, payload, out, next)
                    }
                    _ => Err(invalid(def, "expected { Ok: value } or { Err: error }")),
                }
            }
            CodecDef::Tuple(items) => {
                let values = expect_array(value, def)?;
                if values.len() != items.len() {
                    return Err(invalid(
                        def,
                        &format!("expected {} elements, found {}", items.len(), values.len()),
                    ));
                }
                for (item, item_value) in items.iter().zip(values) {
                    self.encode(item, item_value, out, next)?;
                }
                Ok(())
            }
            CodecDef::FixedArray(len, elem) => {
                if let Some(bytes) = self.byte_string(elem, value, depth)? {
                    if bytes.len() != *len {
                        return Err(invalid(def, &format!("expected {len} bytes, found {}", bytes.len())));
                    }
                    out.extend_from_slice(&bytes);
                    return Ok(());
                }
                let values = expect_array(value, def)?;
                if values.len() != *len {
                    return Err(invalid(
                        def,
                        &format!("expected {len} elements, found {}", values.len()),
                    ));
                }
                for item in values {
                    self.encode(elem, item, out, next)?;
                }
                Ok(())
            }
            CodecDef::FixedBytes(len) => encode_fixed_bytes(def, *len, value, out),
            CodecDef::BTreeMap(key, val) => {
                let text_keys = matches!(
                    self.concrete(key, depth)?.as_ref(),
                    CodecDef::Primitive(Primitive::Text)
                );
                match value {
                    Value::Object(map) if text_keys => {
                        encode_compact(len_u128(map.len()), out);
                        for (k, v) in map {
                            encode_primitive(Primitive::Text, &Value::String(k.clone()), out)?;
                            self.encode(val, v, out, next)?;
                        }
                        Ok(())
                    }
                    Value::Array(pairs) => {
                        encode_compact(len_u128(pairs.len()), out);
                        for pair in pairs {
                            match pair.as_array().map(Vec::as_slice) {
                                Some([k, v]) => {
                                    self.encode(key, k, out, next)?;
                                    self.encode(val, v, out, next)?;
                                }
                                _ => return Err(invalid(def, "expected [key, value] pairs")),
                            }
                        }
                        Ok(())
                    }
                    _ => Err(invalid(def, "expected an array of [key, value] pairs")),
                }
            }
            CodecDef::Compact(inner) => {
                let bits = self.compact_bits(inner, depth)?;
                let number = parse_unsigned(value, def)?;
                check_unsigned(number, bits, def)?;
                encode_compact(number, out);
                Ok(())
            }
            CodecDef::Ref { .. } => {
                let resolved = self.concrete(def, depth)?;
                self.encode(&resolved, value, out, next)
            }
            CodecDef::Param(name) => Err(CodecError::UnboundParam(name.clone())),
        }
    }

    fn decode(&self, def: &CodecDef, input: &mut &[u8], depth: usize) -> Result<Value, CodecError> {
        if depth > MAX_DEPTH {
            return Err(CodecError::TooDeep(MAX_DEPTH));
        }
        let next = depth + 1;

        match def {
            CodecDef::Primitive(primitive) => decode_primitive(*primitive, input),
            CodecDef::Null => Ok(Value::Null),
            CodecDef::Struct(fields) => {
                let mut object = Map::new();
                for (name, field) in fields {
                    object.insert(name.clone(), self.decode(field, input, next)?);
                }
                Ok(Value::Object(object))
            }
            CodecDef::Enum(variants) => {
                let index = take(input, 1)?[0];
                let (name, payload_def) = variants
                    .get_index(usize::from(index))
                    .ok_or_else(|| invalid(def, &format!("variant index {index} out of range")))?;
                let payload = self.decode(payload_def, input, next)?;
                if matches!(payload_def, CodecDef::Null) {
                    Ok(Value::String(name.clone()))
                } else {
                    let mut object = Map::new();
                    object.insert(name.clone(), payload);
                    Ok(Value::Object(object))
                }
            }
            CodecDef::Vec(elem) => {
                let len = self.sequence_len(def, &[elem.as_ref()], input, depth)?;
                let mut items = Vec::new();
                for _ in 0..len {
                    items.push(self.decode(elem, input, next)?);
                }
                Ok(Value::Array(items))
            }
            CodecDef::Option(inner) => {
                let is_bool = matches!(
                    self.concrete(inner, depth)?.as_ref(),
                    CodecDef::Primitive(Primitive::Bool)
                );
                match (take(input, 1)?[0], is_bool) {
                    (0, _) => Ok(Value::Null),
                    (1, true) => Ok(Value::Bool(true)),
                    (2, true) => Ok(Value::Bool(false)),
                    (1, false) => self.decode(inner, input, next),
                    (tag, _) => Err(invalid(def, &format!("invalid option tag {tag}"))),
                }
            }
            CodecDef::Result(ok, err) => {
                let (key, payload) = match take(input, 1)?[0] {
                    0 => ("Ok", self.decode(ok, input, next)?),
                    1 => ("Err", self.decode(err, input, next)?),
                    tag => return Err(invalid(def, &format!("invalid result tag {tag}"))),
                };
                let mut object = Map::new();
                object.insert(key.to_string(), payload);
                Ok(Value::Object(object))
            }
            CodecDef::Tuple(items) => items
                .iter()
                .map(|item| self.decode(item, input, next))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            CodecDef::FixedArray(len, elem) => (0..*len)
                .map(|_| self.decode(elem, input, next))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            CodecDef::FixedBytes(len) => Ok(hex_value(take(input, *len)?)),
            CodecDef::BTreeMap(key, val) => {
                let len = self.sequence_len(def, &[key.as_ref(), val.as_ref()], input, depth)?;
                let mut pairs = Vec::new();
                for _ in 0..len {
                    let k = self.decode(key, input, next)?;
                    let v = self.decode(val, input, next)?;
                    pairs.push(Value::Array(vec![k, v]));
                }
                Ok(Value::Array(pairs))
            }
            CodecDef::Compact(inner) => {
                let bits = self.compact_bits(inner, depth)?;
                let number = decode_compact(input)?;
                check_unsigned(number, bits, def)?;
                Ok(unsigned_value(number, bits))
            }
            CodecDef::Ref { .. } => {
                let resolved = self.concrete(def, depth)?;
                self.decode(&resolved, input, next)
            }
            CodecDef::Param(name) => Err(CodecError::UnboundParam(name.clone())),
        }
    }

    /// Reads a sequence length. Items that occupy bytes cannot outnumber the
    /// remaining input; zero-size items are capped at [`MAX_ZERO_SIZE_ITEMS`].
    fn sequence_len(
        &self,
        def: &CodecDef,
        items: &[&CodecDef],
        input: &mut &[u8],
        depth: usize,
    ) -> Result<usize, CodecError> {
        let len = decode_len(input)?;
        let mut zero_size = true;
        for item in items {
            zero_size &= self.is_zero_size(item, depth)?;
        }
        if zero_size {
            if len > MAX_ZERO_SIZE_ITEMS {
                return Err(invalid(
                    def,
                    &format!("{len} zero-size items exceed the limit of {MAX_ZERO_SIZE_ITEMS}"),
                ));
            }
        } else if len > input.len() {
            return Err(CodecError::UnexpectedEnd {
                needed: len,
                remaining: input.len(),
            });
        }
        Ok(len)
    }

    /// Whether values of `def` always encode to no bytes.
    fn is_zero_size(&self, def: &CodecDef, depth: usize) -> Result<bool, CodecError> {
        if depth > MAX_DEPTH {
            return Err(CodecError::TooDeep(MAX_DEPTH));
        }
        let next = depth + 1;
        match self.concrete(def, depth)?.as_ref() {
            CodecDef::Null => Ok(true),
            CodecDef::FixedBytes(len) => Ok(*len == 0),
            CodecDef::FixedArray(len, elem) => Ok(*len == 0 || self.is_zero_size(elem, next)?),
            CodecDef::Struct(fields) => {
                for field in fields.values() {
                    if !self.is_zero_size(field, next)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            CodecDef::Tuple(items) => {
                for item in items {
                    if !self.is_zero_size(item, next)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Byte payload of a `u8` sequence given as a hex string.
    fn byte_string(
        &self,
        elem: &CodecDef,
        value: &Value,
        depth: usize,
    ) -> Result<Option<Vec<u8>>, CodecError> {
        let Value::String(text) = value else {
            return Ok(None);
        };
        if !matches!(self.concrete(elem, depth)?.as_ref(), CodecDef::Primitive(Primitive::U8)) {
            return Ok(None);
        }
        parse_hex(text, "Vec.with(U8)").map(Some)
    }

    fn compact_bits(&self, inner: &CodecDef, depth: usize) -> Result<u32, CodecError> {
        match self.concrete(inner, depth)?.as_ref() {
            CodecDef::Primitive(primitive) => match primitive.integer() {
                Some((bits, false)) => Ok(bits),
                _ => Err(CodecError::InvalidArgument(format!(
                    "Compact requires an unsigned integer, found {}",
                    primitive.name()
                ))),
            },
            other => Err(CodecError::InvalidArgument(format!(
                "Compact requires an unsigned integer, found {other}"
            ))),
        }
    }
}

fn invalid(def: &CodecDef, message: &str) -> CodecError {
    CodecError::InvalidValue {
        codec: def.to_string(),
        message: message.to_string(),
    }
}

fn expect_object<'v>(value: &'v Value, def: &CodecDef) -> Result<&'v Map<String, Value>, CodecError> {
    value.as_object().ok_or_else(|| invalid(def, "expected an object"))
}

fn expect_array<'v>(value: &'v Value, def: &CodecDef) -> Result<&'v Vec<Value>, CodecError> {
    value.as_array().ok_or_else(|| invalid(def, "expected an array"))
}

fn take<'b>(input: &mut &'b [u8], len: usize) -> Result<&'b [u8], CodecError> {
    if input.len() < len {
        return Err(CodecError::UnexpectedEnd {
            needed: len,
            remaining: input.len(),
        });
    }
    let (head, tail) = input.split_at(len);
    *input = tail;
    Ok(head)
}

fn len_u128(len: usize) -> u128 {
    u128::try_from(len).unwrap_or(u128::MAX)
}

/// Writes `value` in compact form.
pub fn encode_compact(value: u128, out: &mut Vec<u8>) {
    if value < 1 << 6 {
        out.push((value << 2).to_le_bytes()[0]);
    } else if value < 1 << 14 {
        out.extend_from_slice(&((value << 2) | 0b01).to_le_bytes()[..2]);
    } else if value < 1 << 30 {
        out.extend_from_slice(&((value << 2) | 0b10).to_le_bytes()[..4]);
    } else {
        let bytes = value.to_le_bytes();
        let len = bytes
            .iter()
            .rposition(|&b| b != 0)
            .map_or(1, |last| last + 1)
            .max(4);
        out.push((((len - 4) << 2) | 0b11).to_le_bytes()[0]);
        out.extend_from_slice(&bytes[..len]);
    }
}

/// Reads a compact-encoded integer.
///
/// # Errors
///
/// Returns error on truncated input or an oversized prefix.
pub fn decode_compact(input: &mut &[u8]) -> Result<u128, CodecError> {
    let first = take(input, 1)?[0];
    match first & 0b11 {
        0b00 => Ok(u128::from(first >> 2)),
        0b01 => {
            let rest = take(input, 1)?;
            Ok(u128::from(u16::from_le_bytes([first, rest[0]]) >> 2))
        }
        0b10 => {
            let rest = take(input, 3)?;
            Ok(u128::from(
                u32::from_le_bytes([first, rest[0], rest[1], rest[2]]) >> 2,
            ))
        }
        _ => {
            let len = usize::from(first >> 2) + 4;
            if len > 16 {
                return Err(CodecError::InvalidValue {
                    codec: "Compact".to_string(),
                    message: format!("{len}-byte compact integers are not supported"),
                });
            }
            Ok(le_unsigned(take(input, len)?))
        }
    }
}

fn decode_len(input: &mut &[u8]) -> Result<usize, CodecError> {
    let len = decode_compact(input)?;
    usize::try_from(len).map_err(|_| CodecError::UnexpectedEnd {
        needed: usize::MAX,
        remaining: input.len(),
    })
}

fn le_unsigned(bytes: &[u8]) -> u128 {
    let mut buf = [0u8; 16];
    buf[..bytes.len()].copy_from_slice(bytes);
    u128::from_le_bytes(buf)
}

fn le_signed(bytes: &[u8]) -> i128 {
    let negative = bytes.last().is_some_and(|&b| b & 0x80 != 0);
    let mut buf = if negative { [0xff; 16] } else { [0u8; 16] };
    buf[..bytes.len()].copy_from_slice(bytes);
    i128::from_le_bytes(buf)
}

fn parse_unsigned(value: &Value, def: &CodecDef) -> Result<u128, CodecError> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| invalid(def, &format!("{number} is not an unsigned integer"))),
        Value::String(text) => text
            .trim()
            .parse::<u128>()
            .map_err(|_| invalid(def, &format!("'{text}' is not an unsigned integer"))),
        _ => Err(invalid(def, "expected an integer")),
    }
}

fn parse_signed(value: &Value, def: &CodecDef) -> Result<i128, CodecError> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .map(i128::from)
            .or_else(|| number.as_u64().map(i128::from))
            .ok_or_else(|| invalid(def, &format!("{number} is not an integer"))),
        Value::String(text) => text
            .trim()
            .parse::<i128>()
            .map_err(|_| invalid(def, &format!("'{text}' is not an integer"))),
        _ => Err(invalid(def, "expected an integer")),
    }
}

fn check_unsigned(number: u128, bits: u32, def: &CodecDef) -> Result<(), CodecError> {
    if bits < 128 && number >> bits != 0 {
        return Err(invalid(def, &format!("{number} exceeds {bits} bits")));
    }
    Ok(())
}

fn unsigned_value(number: u128, bits: u32) -> Value {
    match u64::try_from(number) {
        Ok(small) if bits <= 64 => Value::from(small),
        _ => Value::String(number.to_string()),
    }
}

fn byte_len(bits: u32) -> usize {
    usize::try_from(bits / 8).unwrap_or(16)
}

fn parse_hex(text: &str, codec: &str) -> Result<Vec<u8>, CodecError> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(digits).map_err(|e| CodecError::InvalidValue {
        codec: codec.to_string(),
        message: format!("invalid hex: {e}"),
    })
}

fn hex_value(bytes: &[u8]) -> Value {
    Value::String(format!("0x{}", hex::encode(bytes)))
}

fn encode_fixed_bytes(
    def: &CodecDef,
    len: usize,
    value: &Value,
    out: &mut Vec<u8>,
) -> Result<(), CodecError> {
    let text = value
        .as_str()
        .ok_or_else(|| invalid(def, "expected a 0x-prefixed hex string"))?;
    let bytes = parse_hex(text, &def.to_string())?;
    if bytes.len() != len {
        return Err(invalid(def, &format!("expected {len} bytes, found {}", bytes.len())));
    }
    out.extend_from_slice(&bytes);
    Ok(())
}

fn encode_primitive(primitive: Primitive, value: &Value, out: &mut Vec<u8>) -> Result<(), CodecError> {
    let def = CodecDef::Primitive(primitive);
    if let Some((bits, signed)) = primitive.integer() {
        let len = byte_len(bits);
        if signed {
            let number = parse_signed(value, &def)?;
            if bits < 128 {
                let limit = 1i128 << (bits - 1);
                if number < -limit || number >= limit {
                    return Err(invalid(&def, &format!("{number} is out of range")));
                }
            }
            out.extend_from_slice(&number.to_le_bytes()[..len]);
        } else {
            let number = parse_unsigned(value, &def)?;
            check_unsigned(number, bits, &def)?;
            out.extend_from_slice(&number.to_le_bytes()[..len]);
        }
        return Ok(());
    }
    if let Some(len) = primitive.fixed_bytes() {
        return encode_fixed_bytes(&def, len, value, out);
    }

    match primitive {
        Primitive::Bool => {
            let flag = value.as_bool().ok_or_else(|| invalid(&def, "expected a boolean"))?;
            out.push(u8::from(flag));
        }
        Primitive::Text => {
            let text = value.as_str().ok_or_else(|| invalid(&def, "expected a string"))?;
            encode_compact(len_u128(text.len()), out);
            out.extend_from_slice(text.as_bytes());
        }
        Primitive::Bytes => {
            let text = value
                .as_str()
                .ok_or_else(|| invalid(&def, "expected a 0x-prefixed hex string"))?;
            let bytes = parse_hex(text, primitive.name())?;
            encode_compact(len_u128(bytes.len()), out);
            out.extend_from_slice(&bytes);
        }
        _ => return Err(invalid(&def, "unsupported primitive")),
    }
    Ok(())
}

fn decode_primitive(primitive: Primitive, input: &mut &[u8]) -> Result<Value, CodecError> {
    let def = CodecDef::Primitive(primitive);
    if let Some((bits, signed)) = primitive.integer() {
        let bytes = take(input, byte_len(bits))?;
        return Ok(if signed {
            let number = le_signed(bytes);
            match i64::try_from(number) {
                Ok(small) if bits <= 64 => Value::from(small),
                _ => Value::String(number.to_string()),
            }
        } else {
            unsigned_value(le_unsigned(bytes), bits)
        });
    }
    if let Some(len) = primitive.fixed_bytes() {
        return Ok(hex_value(take(input, len)?));
    }

    match primitive {
        Primitive::Bool => match take(input, 1)?[0] {
            0 => Ok(Value::Bool(false)),
            1 => Ok(Value::Bool(true)),
            other => Err(invalid(&def, &format!("invalid boolean byte {other}"))),
        },
        Primitive::Text => {
            let len = decode_len(input)?;
            let bytes = take(input, len)?;
            String::from_utf8(bytes.to_vec())
                .map(Value::String)
                .map_err(|_| invalid(&def, "invalid UTF-8"))
        }
        Primitive::Bytes => {
            let len = decode_len(input)?;
            Ok(hex_value(take(input, len)?))
        }
        _ => Err(invalid(&def, "unsupported primitive")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use serde_json::json;

    struct NoRefs;

    impl CodecLookup for NoRefs {
        fn resolve(&self, name: &str, _args: &[CodecDef]) -> Result<CodecDef, CodecError> {
            Err(CodecError::Unresolved(name.to_string()))
        }
    }

    struct Loop;

    impl CodecLookup for Loop {
        fn resolve(&self, name: &str, _args: &[CodecDef]) -> Result<CodecDef, CodecError> {
            Ok(CodecDef::reference(name))
        }
    }

    fn prim(primitive: Primitive) -> CodecDef {
        CodecDef::Primitive(primitive)
    }

    fn enc(def: &CodecDef, value: &Value) -> Vec<u8> {
        encode(def, value, &NoRefs).unwrap()
    }

    #[test]
    fn test_integers_little_endian() {
        assert_eq!(enc(&prim(Primitive::U32), &json!(1)), vec![1, 0, 0, 0]);
        assert_eq!(enc(&prim(Primitive::I16), &json!(-2)), vec![0xfe, 0xff]);
        assert_eq!(
            decode(&prim(Primitive::I16), &[0xfe, 0xff], &NoRefs).unwrap(),
            json!(-2)
        );
    }

    #[test]
    fn test_u128_decodes_to_string() {
        let max = u128::MAX.to_string();
        let bytes = enc(&prim(Primitive::U128), &json!(max));
        assert_eq!(bytes, vec![0xff; 16]);
        assert_eq!(decode(&prim(Primitive::U128), &bytes, &NoRefs).unwrap(), json!(max));
    }

    #[test]
    fn test_integer_range_checked() {
        assert!(encode(&prim(Primitive::U8), &json!(256), &NoRefs).is_err());
        assert!(encode(&prim(Primitive::I8), &json!(-129), &NoRefs).is_err());
        assert!(encode(&prim(Primitive::U8), &json!("x"), &NoRefs).is_err());
    }

    #[test]
    fn test_compact_modes() {
        let cases: [(u128, &[u8]); 5] = [
            (0, &[0x00]),
            (63, &[0xfc]),
            (64, &[0x01, 0x01]),
            (16_384, &[0x02, 0x00, 0x01, 0x00]),
            (1 << 30, &[0x03, 0x00, 0x00, 0x00, 0x40]),
        ];
        for (value, expected) in cases {
            let mut out = Vec::new();
            encode_compact(value, &mut out);
            assert_eq!(out, expected, "encoding {value}");
            let mut input = expected;
            assert_eq!(decode_compact(&mut input).unwrap(), value);
            assert!(input.is_empty());
        }
    }

    #[test]
    fn test_text_and_vec() {
        assert_eq!(enc(&prim(Primitive::Text), &json!("hi")), vec![8, b'h', b'i']);
        let def = CodecDef::Vec(Box::new(prim(Primitive::U16)));
        assert_eq!(enc(&def, &json!([1, 2])), vec![8, 1, 0, 2, 0]);
    }

    #[test]
    fn test_byte_vectors_accept_hex() {
        let def = CodecDef::Vec(Box::new(prim(Primitive::U8)));
        assert_eq!(enc(&def, &json!("0x0102")), vec![8, 1, 2]);
        assert_eq!(enc(&def, &json!([1, 2])), vec![8, 1, 2]);
        assert_eq!(decode(&def, &[8, 1, 2], &NoRefs).unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_option_bool_single_byte() {
        let def = CodecDef::Option(Box::new(prim(Primitive::Bool)));
        assert_eq!(enc(&def, &json!(null)), vec![0]);
        assert_eq!(enc(&def, &json!(true)), vec![1]);
        assert_eq!(enc(&def, &json!(false)), vec![2]);
        assert_eq!(decode(&def, &[2], &NoRefs).unwrap(), json!(false));

        let def = CodecDef::Option(Box::new(prim(Primitive::U8)));
        assert_eq!(enc(&def, &json!(7)), vec![1, 7]);
    }

    #[test]
    fn test_result_and_enum() {
        let result = CodecDef::Result(Box::new(prim(Primitive::U8)), Box::new(prim(Primitive::Text)));
        assert_eq!(enc(&result, &json!({"Err": "x"})), vec![1, 4, b'x']);
        assert_eq!(decode(&result, &[0, 9], &NoRefs).unwrap(), json!({"Ok": 9}));

        let shape = CodecDef::Enum(IndexMap::from([
            ("Circle".to_string(), prim(Primitive::U32)),
            ("Empty".to_string(), CodecDef::Null),
        ]));
        assert_eq!(enc(&shape, &json!({"Circle": 2})), vec![0, 2, 0, 0, 0]);
        assert_eq!(enc(&shape, &json!("Empty")), vec![1]);
        assert_eq!(decode(&shape, &[1], &NoRefs).unwrap(), json!("Empty"));
        assert!(encode(&shape, &json!("Square"), &NoRefs).is_err());
    }

    #[test]
    fn test_struct_field_order_and_missing_field() {
        let def = CodecDef::Struct(IndexMap::from([
            ("x".to_string(), prim(Primitive::U8)),
            ("y".to_string(), prim(Primitive::U8)),
        ]));
        assert_eq!(enc(&def, &json!({"y": 2, "x": 1})), vec![1, 2]);
        let err = encode(&def, &json!({"x": 1}), &NoRefs).unwrap_err();
        assert!(err.to_string().contains("missing field 'y'"));
    }

    #[test]
    fn test_hashes_and_fixed_arrays() {
        let account = "0x".to_string() + &"11".repeat(32);
        let bytes = enc(&prim(Primitive::AccountId), &json!(account));
        assert_eq!(bytes, vec![0x11; 32]);
        assert_eq!(
            decode(&prim(Primitive::AccountId), &bytes, &NoRefs).unwrap(),
            json!(account)
        );
        assert!(encode(&prim(Primitive::H160), &json!("0x11"), &NoRefs).is_err());

        let def = CodecDef::FixedArray(2, Box::new(prim(Primitive::U16)));
        assert_eq!(enc(&def, &json!([1, 2])), vec![1, 0, 2, 0]);
        assert!(encode(&def, &json!([1]), &NoRefs).is_err());
    }

    #[test]
    fn test_btree_map_pairs_and_objects() {
        let def = CodecDef::BTreeMap(Box::new(prim(Primitive::Text)), Box::new(prim(Primitive::U8)));
        let expected = vec![4, 4, b'a', 1];
        assert_eq!(enc(&def, &json!({"a": 1})), expected);
        assert_eq!(enc(&def, &json!([["a", 1]])), expected);
        assert_eq!(decode(&def, &expected, &NoRefs).unwrap(), json!([["a", 1]]));
    }

    #[test]
    fn test_compact_wrapper() {
        let def = CodecDef::Compact(Box::new(prim(Primitive::U32)));
        assert_eq!(enc(&def, &json!(64)), vec![0x01, 0x01]);
        assert!(encode(&CodecDef::Compact(Box::new(prim(Primitive::Text))), &json!(1), &NoRefs).is_err());
    }

    #[test]
    fn test_decode_rejects_trailing_and_truncated_input() {
        assert!(matches!(
            decode(&prim(Primitive::U8), &[1, 2], &NoRefs),
            Err(CodecError::TrailingBytes(1))
        ));
        assert!(matches!(
            decode(&prim(Primitive::U32), &[1], &NoRefs),
            Err(CodecError::UnexpectedEnd { needed: 4, remaining: 1 })
        ));
    }

    #[test]
    fn test_vec_of_zero_size_items() {
        let nulls = CodecDef::Vec(Box::new(CodecDef::Null));
        let bytes = encode(&nulls, &json!([null, null, null]), &NoRefs).unwrap();
        assert_eq!(bytes, vec![12]);
        assert_eq!(decode(&nulls, &bytes, &NoRefs).unwrap(), json!([null, null, null]));

        let empty = CodecDef::Vec(Box::new(CodecDef::Struct(IndexMap::new())));
        assert_eq!(decode(&empty, &[8], &NoRefs).unwrap(), json!([{}, {}]));

        let mut huge = Vec::new();
        encode_compact(len_u128(MAX_ZERO_SIZE_ITEMS + 1), &mut huge);
        assert!(matches!(
            decode(&nulls, &huge, &NoRefs),
            Err(CodecError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_sized_items_cannot_outnumber_input() {
        let bytes_vec = CodecDef::Vec(Box::new(prim(Primitive::U16)));
        assert!(matches!(
            decode(&bytes_vec, &[12, 1, 0], &NoRefs),
            Err(CodecError::UnexpectedEnd { needed: 3, remaining: 2 })
        ));
    }

    #[test]
    fn test_reference_cycle_is_bounded() {
        let err = encode(&CodecDef::reference("A"), &json!(1), &Loop).unwrap_err();
        assert!(matches!(err, CodecError::TooDeep(_)));
    }

    #[test]
    fn test_unbound_param() {
        let err = encode(&CodecDef::Param("T".to_string()), &json!(1), &NoRefs).unwrap_err();
        assert!(matches!(err, CodecError::UnboundParam(name) if name == "T"));
    }
}
