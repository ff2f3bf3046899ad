mod atomic_io;
mod tmx;

pub use atomic_io::{write_bytes_atomic, write_text_atomic};
pub use tmx::{
    load_tmx, parse_tmx, Properties, SourceLocation, TmxError, TmxImage, TmxMap, TmxObject,
    TmxObjectGroup, TmxTileLayer, TmxTileset,
};
