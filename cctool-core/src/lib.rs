//! Core of cctool: the multi-valued record model, field translation,
//! merging, and codecs for contact and calendar formats.

pub mod codec;
pub mod config;
pub mod error;
pub mod formats;
pub mod kind;
pub mod merge;
pub mod multidict;
pub mod pipeline;
pub mod remap;
pub mod value;

pub use codec::{Codec, RecordStream};
pub use crate::config::CctoolConfig;
pub use error::{CctoolError, CctoolResult};
pub use formats::Format;
pub use kind::{Kind, event_to_person, translate_kind};
pub use merge::{MergePolicy, merged};
pub use multidict::{MultiDict, Record};
pub use pipeline::{
    ConvertJob, ConvertReport, Destination, InputSource, MergeSpec, OutputTarget, Source, run,
};
pub use remap::{Direction, FieldMap, Unmapped, map_keys};
pub use value::Value;
