//! EOS contract interfaces (ABIs) and the binary action decoder that uses
//! them.
//!
//! An ABI describes the binary layout of every action a contract accepts in
//! terms of built-in types, type aliases, structs and variants. Decoding walks
//! that description over the raw action bytes and produces JSON.

use crate::{
    chain::{cache::Descriptor, eos::key},
    error::{Error, Result},
};
use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::str::FromStr;

/// How deep type resolution can go before we assume the ABI is circular.
const MAX_DEPTH: usize = 32;

/// Milliseconds between the unix epoch and the block timestamp epoch
/// (2000-01-01).
const BLOCK_TIMESTAMP_EPOCH_MS: i64 = 946_684_800_000;

const NAME_CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";

/// An EOS name: up to 13 characters of `.1-5a-z` packed into a u64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(u64);

impl Name {
    pub fn from_u64(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        if bytes.len() > 13 {
            Err(Error::AbiInvalidName(s.into()))?;
        }
        let mut value = 0u64;
        for i in 0..13 {
            let symbol = match bytes.get(i) {
                Some(c) => NAME_CHARMAP.iter()
                    .position(|x| x == c)
                    .ok_or_else(|| Error::AbiInvalidName(s.into()))? as u64,
                None => 0,
            };
            if i < 12 {
                value |= (symbol & 0x1f) << (64 - 5 * (i + 1));
            } else {
                // only four bits left for the last character
                if symbol > 0x0f {
                    Err(Error::AbiInvalidName(s.into()))?;
                }
                value |= symbol;
            }
        }
        Ok(Self(value))
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut chars = [b'.'; 13];
        let mut tmp = self.0;
        for i in 0..13 {
            let (mask, shift) = if i == 0 { (0x0f, 4) } else { (0x1f, 5) };
            chars[12 - i] = NAME_CHARMAP[(tmp & mask) as usize];
            tmp >>= shift;
        }
        let len = chars.iter().rposition(|c| *c != b'.').map(|p| p + 1).unwrap_or(0);
        // the charmap is ascii
        f.write_str(&String::from_utf8_lossy(&chars[..len]))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbiTypeDef {
    pub new_type_name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbiField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbiStruct {
    pub name: String,
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub fields: Vec<AbiField>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbiAction {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    /// The ricardian template for this action, often empty
    #[serde(default)]
    pub ricardian_contract: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbiVariant {
    pub name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

/// A contract ABI as served by `get_abi`.
///
/// Tables, clauses, error messages and extensions are carried along but play
/// no part in decoding actions, so [`Descriptor::stripped`] drops them before
/// the ABI gets cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Abi {
    pub version: String,
    #[serde(default)]
    pub types: Vec<AbiTypeDef>,
    #[serde(default)]
    pub structs: Vec<AbiStruct>,
    #[serde(default)]
    pub actions: Vec<AbiAction>,
    #[serde(default)]
    pub variants: Vec<AbiVariant>,
    #[serde(default)]
    pub tables: Vec<Value>,
    #[serde(default)]
    pub ricardian_clauses: Vec<Value>,
    #[serde(default)]
    pub error_messages: Vec<Value>,
    #[serde(default)]
    pub abi_extensions: Vec<Value>,
}

impl Descriptor for Abi {
    fn stripped(&self) -> Self {
        Self {
            version: self.version.clone(),
            types: self.types.clone(),
            structs: self.structs.clone(),
            actions: self.actions.clone(),
            variants: self.variants.clone(),
            tables: vec![],
            ricardian_clauses: vec![],
            error_messages: vec![],
            abi_extensions: vec![],
        }
    }
}

/// A cursor over action bytes.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            Err(Error::AbiDecodeUnexpectedEnd)?;
        }
        let data: &'a [u8] = self.data;
        let bytes = &data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    /// LEB128, at most five bytes.
    fn read_varuint32(&mut self) -> Result<u32> {
        let mut value = 0u32;
        for i in 0..5 {
            let byte = self.read_u8()?;
            value |= ((byte & 0x7f) as u32) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(Error::AbiDecodeInvalidValue("varuint32 too long".into()))
    }

    fn read_len_prefixed(&mut self) -> Result<&'a [u8]> {
        let len = self.read_varuint32()? as usize;
        self.read_bytes(len)
    }
}

fn symbol_code_string(code: u64) -> String {
    code.to_le_bytes().iter()
        .take_while(|b| **b != 0)
        .map(|b| *b as char)
        .collect()
}

fn format_symbol(symbol: u64) -> String {
    format!("{},{}", symbol & 0xff, symbol_code_string(symbol >> 8))
}

/// `10000` with a `4,EOS` symbol becomes `1.0000 EOS`.
fn format_asset(amount: i64, symbol: u64) -> String {
    let precision = (symbol & 0xff) as usize;
    let mut digits = amount.unsigned_abs().to_string();
    if digits.len() <= precision {
        digits = format!("{}{}", "0".repeat(precision + 1 - digits.len()), digits);
    }
    let (int, frac) = digits.split_at(digits.len() - precision);
    let sign = if amount < 0 { "-" } else { "" };
    if precision > 0 {
        format!("{}{}.{} {}", sign, int, frac, symbol_code_string(symbol >> 8))
    } else {
        format!("{}{} {}", sign, int, symbol_code_string(symbol >> 8))
    }
}

fn format_time(time: DateTime<Utc>, with_fraction: bool) -> String {
    if with_fraction {
        time.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
    } else {
        time.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

fn time_from_micros(micros: i64) -> Result<DateTime<Utc>> {
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1000) as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos)
        .ok_or_else(|| Error::AbiDecodeInvalidValue(format!("time out of range: {}", micros)))
}

fn float_value(val: f64) -> Value {
    serde_json::Number::from_f64(val)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(val.to_string()))
}

/// Decode a built-in type. Returns `None` if `ty` isn't one.
fn decode_builtin(ty: &str, reader: &mut Reader) -> Result<Option<Value>> {
    let value = match ty {
        "bool" => match reader.read_u8()? {
            0 => Value::Bool(false),
            1 => Value::Bool(true),
            x => Err(Error::AbiDecodeInvalidValue(format!("bad bool: {}", x)))?,
        },
        "int8" => Value::from(reader.read_u8()? as i8),
        "uint8" => Value::from(reader.read_u8()?),
        "int16" => Value::from(i16::from_le_bytes(reader.read_array()?)),
        "uint16" => Value::from(u16::from_le_bytes(reader.read_array()?)),
        "int32" => Value::from(i32::from_le_bytes(reader.read_array()?)),
        "uint32" => Value::from(reader.read_u32()?),
        "int64" => Value::from(reader.read_i64()?),
        "uint64" => Value::from(reader.read_u64()?),
        "int128" => Value::from(i128::from_le_bytes(reader.read_array()?).to_string()),
        "uint128" => Value::from(u128::from_le_bytes(reader.read_array()?).to_string()),
        "varuint32" => Value::from(reader.read_varuint32()?),
        "varint32" => {
            let raw = reader.read_varuint32()?;
            Value::from(((raw >> 1) as i32) ^ -((raw & 1) as i32))
        }
        "float32" => float_value(f32::from_le_bytes(reader.read_array()?) as f64),
        "float64" => float_value(f64::from_le_bytes(reader.read_array()?)),
        "float128" => Value::from(hex::encode(reader.read_bytes(16)?)),
        "time_point" => Value::from(format_time(time_from_micros(reader.read_i64()?)?, true)),
        "time_point_sec" => {
            let secs = reader.read_u32()? as i64;
            Value::from(format_time(time_from_micros(secs * 1_000_000)?, false))
        }
        "block_timestamp_type" => {
            let slot = reader.read_u32()? as i64;
            let millis = slot * 500 + BLOCK_TIMESTAMP_EPOCH_MS;
            Value::from(format_time(time_from_micros(millis * 1000)?, true))
        }
        "name" => Value::from(Name::from_u64(reader.read_u64()?).to_string()),
        "bytes" => Value::from(hex::encode(reader.read_len_prefixed()?)),
        "string" => {
            let bytes = reader.read_len_prefixed()?;
            let string = std::str::from_utf8(bytes)
                .map_err(|e| Error::AbiDecodeInvalidValue(format!("bad utf8: {}", e)))?;
            Value::from(string)
        }
        "checksum160" => Value::from(hex::encode(reader.read_bytes(20)?)),
        "checksum256" => Value::from(hex::encode(reader.read_bytes(32)?)),
        "checksum512" => Value::from(hex::encode(reader.read_bytes(64)?)),
        "public_key" => {
            let curve = reader.read_u8()?;
            let point = reader.read_bytes(33)?;
            match curve {
                0 => Value::from(key::PublicKey::from_bytes(point)?.to_string()),
                1 => Value::from(format!("PUB_R1_{}", key::encode_with_suffix(point, b"R1"))),
                x => Err(Error::AbiDecodeInvalidValue(format!("unsupported key type: {}", x)))?,
            }
        }
        "signature" => {
            let curve = reader.read_u8()?;
            let sig = reader.read_bytes(65)?;
            match curve {
                0 => Value::from(key::Signature::from_bytes(sig)?.to_string()),
                1 => Value::from(format!("SIG_R1_{}", key::encode_with_suffix(sig, b"R1"))),
                x => Err(Error::AbiDecodeInvalidValue(format!("unsupported signature type: {}", x)))?,
            }
        }
        "symbol" => Value::from(format_symbol(reader.read_u64()?)),
        "symbol_code" => Value::from(symbol_code_string(reader.read_u64()?)),
        "asset" => {
            let amount = reader.read_i64()?;
            Value::from(format_asset(amount, reader.read_u64()?))
        }
        "extended_asset" => {
            let amount = reader.read_i64()?;
            let quantity = format_asset(amount, reader.read_u64()?);
            let contract = Name::from_u64(reader.read_u64()?).to_string();
            serde_json::json!({"quantity": quantity, "contract": contract})
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

/// A contract's ABI, indexed for decoding.
#[derive(Debug, Clone, getset::Getters)]
pub struct Contract {
    #[getset(get = "pub")]
    account: String,
    types: HashMap<String, String>,
    structs: HashMap<String, AbiStruct>,
    variants: HashMap<String, AbiVariant>,
    actions: HashMap<String, AbiAction>,
}

impl Contract {
    /// Index an ABI for the given contract account.
    pub fn new<T: Into<String>>(account: T, abi: Abi) -> Result<Self> {
        if !abi.version.starts_with("eosio::abi/1.") {
            Err(Error::AbiUnsupportedVersion(abi.version.clone()))?;
        }
        Ok(Self {
            account: account.into(),
            types: abi.types.into_iter().map(|t| (t.new_type_name, t.ty)).collect(),
            structs: abi.structs.into_iter().map(|s| (s.name.clone(), s)).collect(),
            variants: abi.variants.into_iter().map(|v| (v.name.clone(), v)).collect(),
            actions: abi.actions.into_iter().map(|a| (a.name.clone(), a)).collect(),
        })
    }

    /// The ricardian template for an action, if it has one.
    pub fn ricardian(&self, action: &str) -> Option<&str> {
        self.actions.get(action)
            .map(|a| a.ricardian_contract.as_str())
            .filter(|t| !t.trim().is_empty())
    }

    /// Decode an action's binary data. Every byte must be accounted for.
    pub fn decode_action(&self, action: &str, data: &[u8]) -> Result<Value> {
        let def = self.actions.get(action)
            .ok_or_else(|| Error::AbiActionNotFound { contract: self.account.clone(), action: action.into() })?;
        let mut reader = Reader::new(data);
        let value = self.decode(&def.ty, &mut reader, 0)?;
        if reader.remaining() > 0 {
            Err(Error::AbiDecodeTrailingBytes(reader.remaining()))?;
        }
        Ok(value)
    }

    fn decode(&self, ty: &str, reader: &mut Reader, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            Err(Error::AbiRecursionLimit)?;
        }
        // binary extensions only matter inside structs
        let ty = ty.strip_suffix('$').unwrap_or(ty);
        if let Some(inner) = ty.strip_suffix('?') {
            return match reader.read_u8()? {
                0 => Ok(Value::Null),
                1 => self.decode(inner, reader, depth + 1),
                x => Err(Error::AbiDecodeInvalidValue(format!("bad optional flag: {}", x))),
            };
        }
        if let Some(inner) = ty.strip_suffix("[]") {
            let len = reader.read_varuint32()? as usize;
            let mut items = Vec::with_capacity(len.min(reader.remaining()));
            for _ in 0..len {
                let start = reader.remaining();
                items.push(self.decode(inner, reader, depth + 1)?);
                // zero-width elements aren't bounded by the input, so bound the count
                if reader.remaining() == start && len > start {
                    Err(Error::AbiDecodeInvalidValue(format!("{} zero-width elements of {} in {} bytes", len, inner, start)))?;
                }
            }
            return Ok(Value::Array(items));
        }
        if let Some(target) = self.types.get(ty) {
            return self.decode(target, reader, depth + 1);
        }
        if let Some(value) = decode_builtin(ty, reader)? {
            return Ok(value);
        }
        if let Some(def) = self.structs.get(ty) {
            return Ok(Value::Object(self.decode_struct(def, reader, depth)?));
        }
        if let Some(def) = self.variants.get(ty) {
            let index = reader.read_varuint32()? as usize;
            let variant_ty = def.types.get(index)
                .ok_or_else(|| Error::AbiDecodeInvalidValue(format!("variant {} has no index {}", def.name, index)))?;
            let value = self.decode(variant_ty, reader, depth + 1)?;
            return Ok(Value::Array(vec![Value::from(variant_ty.as_str()), value]));
        }
        Err(Error::AbiUnknownType(ty.into()))
    }

    fn decode_struct(&self, def: &AbiStruct, reader: &mut Reader, depth: usize) -> Result<Map<String, Value>> {
        if depth > MAX_DEPTH {
            Err(Error::AbiRecursionLimit)?;
        }
        let mut obj = if def.base.is_empty() {
            Map::new()
        } else {
            let base = self.structs.get(&def.base)
                .ok_or_else(|| Error::AbiUnknownType(def.base.clone()))?;
            self.decode_struct(base, reader, depth + 1)?
        };
        for field in &def.fields {
            if field.ty.ends_with('$') && reader.remaining() == 0 {
                break;
            }
            let value = self.decode(&field.ty, reader, depth + 1)?;
            obj.insert(field.name.clone(), value);
        }
        Ok(obj)
    }
}
