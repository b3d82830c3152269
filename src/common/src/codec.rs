//! Fixed-offset byte layout of tuples.
//!
//! A tuple is a flat byte buffer whose layout is given entirely by the
//! `AttrDesc`s of its relation. Integers are stored as 4 byte little endian
//! `i32`, doubles as 8 byte little endian `f64`, strings as their UTF-8 bytes
//! null padded to the declared attribute length.
use crate::{AttrDesc, CrustyError, DataType, Field, Tuple, DOUBLE_EPSILON};
use std::cmp::Ordering;
use std::convert::TryInto;

/// Borrow `len` bytes starting at `offset` out of a tuple.
///
/// Fails with `BufferOverrun` instead of reading past the end of the tuple.
pub fn extract(tuple: &[u8], offset: usize, len: usize) -> Result<&[u8], CrustyError> {
    match offset.checked_add(len) {
        Some(end) if end <= tuple.len() => Ok(&tuple[offset..end]),
        _ => Err(CrustyError::BufferOverrun {
            offset,
            len,
            size: tuple.len(),
        }),
    }
}

/// Borrow the bytes of one attribute out of a tuple of the attribute's relation.
pub fn extract_attr<'a>(tuple: &'a [u8], attr: &AttrDesc) -> Result<&'a [u8], CrustyError> {
    extract(tuple, attr.offset, attr.len)
}

/// Encode a field into exactly `len` bytes of the given dtype.
///
/// # Arguments
///
/// * `field` - Value to encode.
/// * `dtype` - Declared type of the destination attribute.
/// * `len` - Declared length of the destination attribute.
pub fn field_to_bytes(field: &Field, dtype: DataType, len: usize) -> Result<Vec<u8>, CrustyError> {
    let mut bytes = vec![0; len];
    let raw = match (field, dtype) {
        (Field::IntField(i), DataType::Int) => i.to_le_bytes().to_vec(),
        (Field::DoubleField(d), DataType::Double) => d.to_le_bytes().to_vec(),
        (Field::StringField(s), DataType::String) => s.as_bytes().to_vec(),
        (f, t) => {
            return Err(CrustyError::SchemaMismatch(format!(
                "value {} of type {:?} does not fit attribute of type {:?}",
                f,
                f.dtype(),
                t
            )))
        }
    };
    if raw.len() > len {
        return Err(CrustyError::SchemaMismatch(format!(
            "value {} needs {} bytes but the attribute holds {}",
            field,
            raw.len(),
            len
        )));
    }
    bytes[..raw.len()].copy_from_slice(&raw);
    Ok(bytes)
}

/// Decode an attribute's bytes back into a field.
pub fn field_from_bytes(bytes: &[u8], dtype: DataType) -> Result<Field, CrustyError> {
    match dtype {
        DataType::Int => Ok(Field::IntField(read_i32(bytes)?)),
        DataType::Double => Ok(Field::DoubleField(read_f64(bytes)?)),
        DataType::String => {
            let s = String::from_utf8_lossy(trim_nul(bytes)).to_string();
            Ok(Field::StringField(s))
        }
    }
}

/// Pack a full set of values into a tuple laid out by `attrs`.
///
/// `values[i]` is written at `attrs[i].offset`. Fails with `SchemaMismatch`
/// when the value count differs from the attribute count, a value is null,
/// or a value does not fit its attribute.
pub fn pack(attrs: &[AttrDesc], values: &[Option<Field>]) -> Result<Vec<u8>, CrustyError> {
    if attrs.len() != values.len() {
        return Err(CrustyError::SchemaMismatch(format!(
            "expected {} values, got {}",
            attrs.len(),
            values.len()
        )));
    }
    let tuple_len = attrs.iter().map(|a| a.offset + a.len).max().unwrap_or(0);
    let mut tuple = vec![0; tuple_len];
    for (attr, value) in attrs.iter().zip(values.iter()) {
        let field = value.as_ref().ok_or_else(|| {
            CrustyError::SchemaMismatch(format!("null value for {}.{}", attr.rel_name, attr.attr_name))
        })?;
        let bytes = field_to_bytes(field, attr.dtype, attr.len)?;
        tuple[attr.offset..attr.offset + attr.len].copy_from_slice(&bytes);
    }
    Ok(tuple)
}

/// Decode the given attributes of a tuple, in the order of `attrs`.
pub fn unpack(attrs: &[AttrDesc], tuple: &[u8]) -> Result<Tuple, CrustyError> {
    let mut fields = Vec::with_capacity(attrs.len());
    for attr in attrs {
        fields.push(field_from_bytes(extract_attr(tuple, attr)?, attr.dtype)?);
    }
    Ok(Tuple::new(fields))
}

/// Lay out a projection list back to back, as in an output tuple.
///
/// Returns copies of `attrs` whose offsets point into the projected tuple
/// rather than into the source relations.
pub fn projected_layout(attrs: &[AttrDesc]) -> Vec<AttrDesc> {
    let mut offset = 0;
    attrs
        .iter()
        .map(|a| {
            let mut out = a.clone();
            out.offset = offset;
            offset += a.len;
            out
        })
        .collect()
}

/// Three-way comparison of two attribute values of the same dtype.
///
/// Integers and doubles compare numerically, doubles within `DOUBLE_EPSILON`
/// being equal. Strings compare bytewise over the longer of the two slices,
/// the shorter one treated as null padded, stopping at the first null.
pub fn compare_values(dtype: DataType, left: &[u8], right: &[u8]) -> Result<Ordering, CrustyError> {
    match dtype {
        DataType::Int => Ok(read_i32(left)?.cmp(&read_i32(right)?)),
        DataType::Double => {
            let diff = read_f64(left)? - read_f64(right)?;
            if diff.abs() < DOUBLE_EPSILON {
                Ok(Ordering::Equal)
            } else if diff < 0.0 {
                Ok(Ordering::Less)
            } else {
                Ok(Ordering::Greater)
            }
        }
        DataType::String => Ok(trim_nul(left).cmp(trim_nul(right))),
    }
}

fn read_i32(bytes: &[u8]) -> Result<i32, CrustyError> {
    let raw = extract(bytes, 0, 4)?;
    Ok(i32::from_le_bytes(raw.try_into().unwrap()))
}

fn read_f64(bytes: &[u8]) -> Result<f64, CrustyError> {
    let raw = extract(bytes, 0, 8)?;
    Ok(f64::from_le_bytes(raw.try_into().unwrap()))
}

fn trim_nul(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|b| *b == 0) {
        Some(end) => &bytes[..end],
        None => bytes,
    }
}
