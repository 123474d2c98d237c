//! Packed model files and model spec lookup.
//!
//! # File Format
//!
//! All integers and floats are little-endian.
//! - Header (28 bytes): magic `DVGM`, version, word count, cluster count,
//!   feature count, cluster-matrix rows, idf-matrix rows (all u32)
//! - Cluster-weight matrix: rows × cluster count f32
//! - Idf-vector matrix: rows × feature count f32
//! - Vocabulary: per word a u32 byte length followed by UTF-8 bytes, in row order
//!
//! A model is addressed by name through a `<name>.model.toml` spec that points
//! at its packed file and names the tokenizer the model was trained with.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapOptions};
use serde::Deserialize;
use walkdir::WalkDir;

use crate::error::{DvgError, DvgResult, ErrorContext};
use crate::vector::embedding::ScdvModel;
use crate::vector::types::ModelShape;

/// Current model file format version.
const MODEL_VERSION: u32 = 1;

/// Magic bytes identifying packed model files.
const MAGIC_BYTES: &[u8; 4] = b"DVGM";

/// Magic plus six u32 fields.
const HEADER_SIZE: usize = 28;

const BYTES_PER_F32: usize = 4;

/// Suffix of model spec files.
pub const MODEL_SPEC_SUFFIX: &str = ".model.toml";

/// The only supported model type.
const SCDV_MODEL_TYPE: &str = "scdv";

/// Tokenizer used when a model file is given by path instead of by name.
const DEFAULT_TOKENIZER: &str = "en";

/// Resolved description of an installed model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub version: Option<String>,
    pub tokenizer: String,
    pub file: PathBuf,
}

impl ModelSpec {
    /// File name of the packed model; index files are derived from it.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }
}

#[derive(Debug, Deserialize)]
struct ModelSpecFile {
    #[serde(rename = "type")]
    model_type: String,
    tokenizer: String,
    file: PathBuf,
    version: Option<toml::Value>,
}

/// Finds the spec of model `name` below `model_dir`.
///
/// A `name` that is itself an existing file is taken as a packed model file.
pub fn find_model_spec(model_dir: &Path, name: &str) -> DvgResult<ModelSpec> {
    let direct = Path::new(name);
    if direct.is_file() {
        return Ok(ModelSpec {
            name: name.to_string(),
            version: None,
            tokenizer: DEFAULT_TOKENIZER.to_string(),
            file: direct.to_path_buf(),
        });
    }

    let wanted = format!("{name}{MODEL_SPEC_SUFFIX}");
    let matches: Vec<PathBuf> = WalkDir::new(model_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.file_name().to_string_lossy() == wanted)
        .map(walkdir::DirEntry::into_path)
        .collect();

    match matches.as_slice() {
        [] => Err(DvgError::ModelNotFound {
            name: name.to_string(),
        }),
        [spec_path] => read_model_spec(spec_path, name),
        [first, ..] => Err(DvgError::ModelSpec {
            path: first.clone(),
            reason: format!("{} spec files match model '{name}'", matches.len()),
        }),
    }
}

fn read_model_spec(spec_path: &Path, name: &str) -> DvgResult<ModelSpec> {
    let text = std::fs::read_to_string(spec_path).read_path(spec_path)?;
    let spec: ModelSpecFile = toml::from_str(&text).map_err(|e| DvgError::ModelSpec {
        path: spec_path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if spec.model_type != SCDV_MODEL_TYPE {
        return Err(DvgError::ModelSpec {
            path: spec_path.to_path_buf(),
            reason: format!("unsupported model type '{}'", spec.model_type),
        });
    }

    let dir = spec_path.parent().unwrap_or_else(|| Path::new(""));
    let version = spec.version.map(|v| match v {
        toml::Value::String(s) => s,
        other => other.to_string(),
    });

    Ok(ModelSpec {
        name: name.to_string(),
        version,
        tokenizer: spec.tokenizer,
        file: dir.join(spec.file),
    })
}

/// Loads a packed model file.
pub fn load_model(path: &Path) -> DvgResult<ScdvModel> {
    let file = File::open(path).read_path(path)?;
    // SAFETY: the map is read-only and dropped before this function returns;
    // model files are not modified while a search is running.
    let mmap = unsafe { MmapOptions::new().map(&file) }.read_path(path)?;

    let format_error = |reason: String| DvgError::ModelFormat {
        path: path.to_path_buf(),
        reason,
    };

    let header = read_header(&mmap).map_err(format_error)?;
    if header.cluster_rows != header.idf_rows {
        return Err(DvgError::ModelShapeMismatch {
            cluster_rows: header.cluster_rows,
            idf_rows: header.idf_rows,
        });
    }
    if header.words != header.cluster_rows {
        return Err(format_error(format!(
            "header declares {} words for {} matrix rows",
            header.words, header.cluster_rows
        )));
    }
    let shape = ModelShape::new(header.clusters, header.features)?;

    let mut reader = ByteReader::new(&mmap, HEADER_SIZE);
    let cluster_weights = reader
        .f32_values(header.cluster_rows * header.clusters)
        .map_err(format_error)?;
    let idf_vectors = reader
        .f32_values(header.idf_rows * header.features)
        .map_err(format_error)?;

    let mut words = Vec::with_capacity(header.words);
    for _ in 0..header.words {
        words.push(reader.word().map_err(format_error)?);
    }
    if !reader.is_at_end() {
        return Err(format_error("trailing bytes after vocabulary".to_string()));
    }

    let model = ScdvModel::from_flat(words, shape, &cluster_weights, &idf_vectors)?;
    tracing::debug!(
        path = %path.display(),
        words = model.vocabulary_size(),
        clusters = shape.clusters(),
        features = shape.features(),
        "loaded model"
    );
    Ok(model)
}

/// Writes a packed model file.
pub fn write_model(
    path: &Path,
    words: &[&str],
    shape: ModelShape,
    cluster_weights: &[f32],
    idf_vectors: &[f32],
) -> DvgResult<()> {
    let cluster_rows = cluster_weights.len() / shape.clusters();
    let idf_rows = idf_vectors.len() / shape.features();

    let file = File::create(path).write_path(path)?;
    let mut out = BufWriter::new(file);
    let mut write = || -> std::io::Result<()> {
        out.write_all(MAGIC_BYTES)?;
        for field in [
            MODEL_VERSION,
            to_u32(words.len())?,
            to_u32(shape.clusters())?,
            to_u32(shape.features())?,
            to_u32(cluster_rows)?,
            to_u32(idf_rows)?,
        ] {
            out.write_all(&field.to_le_bytes())?;
        }
        for v in cluster_weights.iter().chain(idf_vectors) {
            out.write_all(&v.to_le_bytes())?;
        }
        for word in words {
            out.write_all(&to_u32(word.len())?.to_le_bytes())?;
            out.write_all(word.as_bytes())?;
        }
        out.flush()
    };
    write().write_path(path)
}

fn to_u32(value: usize) -> std::io::Result<u32> {
    u32::try_from(value).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{value} does not fit the model file format"),
        )
    })
}

#[derive(Debug)]
struct Header {
    words: usize,
    clusters: usize,
    features: usize,
    cluster_rows: usize,
    idf_rows: usize,
}

fn read_header(mmap: &Mmap) -> Result<Header, String> {
    if mmap.len() < HEADER_SIZE {
        return Err("file too small to contain header".to_string());
    }
    if &mmap[0..4] != MAGIC_BYTES {
        return Err("invalid magic bytes".to_string());
    }

    let field = |i: usize| {
        let at = 4 + i * 4;
        u32::from_le_bytes([mmap[at], mmap[at + 1], mmap[at + 2], mmap[at + 3]])
    };
    let version = field(0);
    if version != MODEL_VERSION {
        return Err(format!(
            "unsupported version {version}, expected {MODEL_VERSION}"
        ));
    }

    Ok(Header {
        words: field(1) as usize,
        clusters: field(2) as usize,
        features: field(3) as usize,
        cluster_rows: field(4) as usize,
        idf_rows: field(5) as usize,
    })
}

/// Bounds-checked cursor over the mapped bytes.
struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], String> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| format!("truncated at byte {}", self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn f32_values(&mut self, count: usize) -> Result<Vec<f32>, String> {
        let len = count
            .checked_mul(BYTES_PER_F32)
            .ok_or_else(|| format!("matrix of {count} values is too large"))?;
        Ok(self
            .take(len)?
            .chunks_exact(BYTES_PER_F32)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }

    fn word(&mut self) -> Result<String, String> {
        let len = self.take(4)?;
        let len = u32::from_le_bytes([len[0], len[1], len[2], len[3]]) as usize;
        let at = self.pos;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| format!("word at byte {at} is not UTF-8"))
    }

    fn is_at_end(&self) -> bool {
        self.pos == self.bytes.len()
    }
}
