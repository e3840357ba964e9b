use std::{collections::HashMap, fs::File, marker::PhantomData, ops::Range, path::Path, str::FromStr};

use memmap2::Mmap;
use safetensors::{Dtype, SafeTensors};

use crate::{EstimatorErr, Result};

const HEADER_LEN_SIZE: usize = size_of::<u64>();

/// Primitive element types that can be stored in an artifact tensor.
///
/// Payloads are little endian, so reads go through `bytemuck` with the host byte order.
pub trait Element: bytemuck::Pod {
    const DTYPE: Dtype;
}

impl Element for i32 {
    const DTYPE: Dtype = Dtype::I32;
}

impl Element for i64 {
    const DTYPE: Dtype = Dtype::I64;
}

impl Element for f32 {
    const DTYPE: Dtype = Dtype::F32;
}

impl Element for f64 {
    const DTYPE: Dtype = Dtype::F64;
}

struct TensorEntry {
    dtype: Dtype,
    shape: Vec<usize>,
    range: Range<usize>,
}

/// A safetensors file mapped into memory.
///
/// Only the header is parsed when opening; tensor payloads stay in the page cache and are
/// touched element by element through [`Column`] handles.
pub(crate) struct MappedArtifact {
    mmap: Mmap,
    tensors: HashMap<String, TensorEntry>,
    metadata: HashMap<String, String>,
}

impl MappedArtifact {
    /// Maps the artifact at `path` and indexes its header.
    ///
    /// # Arguments
    /// * `path` - Location of the safetensors file.
    ///
    /// # Returns
    /// The mapped artifact or an error if the file can't be read or its header is invalid.
    pub fn open(path: &Path) -> Result<Self> {
        let io_err = |source| EstimatorErr::Io {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(io_err)?;

        // SAFETY: The mapping is read-only and artifacts are never rewritten while the
        //         service runs. Every read below is bounds checked against the mapping.
        let mmap = unsafe { Mmap::map(&file) }.map_err(io_err)?;

        let (header_len, meta) = SafeTensors::read_metadata(&mmap[..])?;
        let data_start = HEADER_LEN_SIZE + header_len;

        let tensors = meta
            .tensors()
            .into_iter()
            .map(|(name, info)| {
                let (start, end) = info.data_offsets;
                let entry = TensorEntry {
                    dtype: info.dtype,
                    shape: info.shape.clone(),
                    range: data_start + start..data_start + end,
                };
                (name, entry)
            })
            .collect();

        let metadata = meta.metadata().clone().unwrap_or_default();

        Ok(Self {
            mmap,
            tensors,
            metadata,
        })
    }

    /// Returns the raw metadata value for `key`, if any.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Parses the metadata value for `key`, falling back to `default` when absent.
    pub fn meta_or<T: FromStr>(&self, key: &'static str, default: T) -> Result<T> {
        match self.meta(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|_| EstimatorErr::InvalidMetadata {
                key,
                value: raw.to_string(),
            }),
        }
    }

    /// Parses the metadata value for a required `key`.
    pub fn meta_required<T: FromStr>(&self, key: &'static str) -> Result<T> {
        let raw = self.meta(key).ok_or(EstimatorErr::MissingMetadata { key })?;
        raw.trim().parse().map_err(|_| EstimatorErr::InvalidMetadata {
            key,
            value: raw.to_string(),
        })
    }

    /// Resolves a one-dimensional tensor into a typed column handle.
    ///
    /// # Arguments
    /// * `name` - The tensor name.
    /// * `expected_len` - If given, the exact amount of elements the tensor must hold.
    ///
    /// # Returns
    /// A column handle or an error if the tensor is missing or has the wrong dtype or shape.
    pub fn column<T: Element>(&self, name: &str, expected_len: Option<usize>) -> Result<Column<T>> {
        let entry = self
            .tensors
            .get(name)
            .ok_or_else(|| EstimatorErr::MissingTensor {
                name: name.to_string(),
            })?;

        if entry.dtype != T::DTYPE {
            return Err(EstimatorErr::DtypeMismatch {
                name: name.to_string(),
                got: entry.dtype,
                expected: T::DTYPE,
            });
        }

        let len = entry.range.len() / size_of::<T>();
        let is_flat = entry.shape.len() == 1 && entry.shape[0] == len;

        if !is_flat || expected_len.is_some_and(|expected| expected != len) {
            return Err(EstimatorErr::ShapeMismatch {
                name: name.to_string(),
                got: entry.shape.clone(),
                expected: expected_len.unwrap_or(len),
            });
        }

        if entry.range.end > self.mmap.len() {
            return Err(EstimatorErr::ShapeMismatch {
                name: name.to_string(),
                got: entry.shape.clone(),
                expected: (self.mmap.len().saturating_sub(entry.range.start)) / size_of::<T>(),
            });
        }

        Ok(Column {
            start: entry.range.start,
            len,
            _marker: PhantomData,
        })
    }

    /// Reads the `i`-th element of `column` straight from the mapping.
    pub fn read<T: Element>(&self, column: &Column<T>, i: usize) -> Option<T> {
        if i >= column.len {
            return None;
        }

        let size = size_of::<T>();
        let start = column.start + i * size;
        self.mmap
            .get(start..start + size)
            .map(bytemuck::pod_read_unaligned)
    }
}

/// A typed view over a flat tensor inside a [`MappedArtifact`].
///
/// The handle only stores offsets, the bytes are owned by the artifact.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Column<T> {
    start: usize,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T> Column<T> {
    pub fn len(&self) -> usize {
        self.len
    }
}
