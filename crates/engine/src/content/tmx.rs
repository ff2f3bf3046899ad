use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use thiserror::Error;

const GID_FLIP_MASK: u32 = 0x1FFF_FFFF;

pub type Properties = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Error)]
pub enum TmxError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed XML in {file} at {location}: {message}")]
    Malformed {
        file: String,
        message: String,
        location: SourceLocation,
    },
    #[error("invalid map data in {file} at {location}: {message}")]
    Invalid {
        file: String,
        message: String,
        location: SourceLocation,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TmxMap {
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub properties: Properties,
    pub tilesets: Vec<TmxTileset>,
    pub layers: Vec<TmxTileLayer>,
    pub object_groups: Vec<TmxObjectGroup>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TmxTileset {
    pub first_gid: u32,
    pub name: String,
    pub columns: u32,
    pub tile_count: u32,
    pub image: Option<TmxImage>,
    pub tile_properties: BTreeMap<u32, Properties>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TmxImage {
    pub source: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TmxTileLayer {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub visible: bool,
    pub properties: Properties,
    gids: Vec<u32>,
}

impl TmxTileLayer {
    /// Global tile id with flip flags stripped; 0 means empty.
    pub fn gid_at(&self, x: u32, y: u32) -> u32 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.gids
            .get((y * self.width + x) as usize)
            .map(|gid| gid & GID_FLIP_MASK)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TmxObjectGroup {
    pub name: String,
    pub objects: Vec<TmxObject>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TmxObject {
    pub id: u32,
    pub name: String,
    pub class: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub properties: Properties,
}

impl TmxMap {
    pub fn pixel_width(&self) -> u32 {
        self.width * self.tile_width
    }

    pub fn pixel_height(&self) -> u32 {
        self.height * self.tile_height
    }

    /// Properties of the tileset tile a global id refers to.
    pub fn tile_properties(&self, gid: u32) -> Option<&Properties> {
        let gid = gid & GID_FLIP_MASK;
        if gid == 0 {
            return None;
        }
        let tileset = self
            .tilesets
            .iter()
            .filter(|tileset| tileset.first_gid <= gid)
            .max_by_key(|tileset| tileset.first_gid)?;
        tileset.tile_properties.get(&(gid - tileset.first_gid))
    }

    /// Tileset image and source rectangle (x, y, w, h in image pixels) for
    /// a global id.
    pub fn tile_image_rect(&self, gid: u32) -> Option<(&TmxImage, u32, u32, u32, u32)> {
        let gid = gid & GID_FLIP_MASK;
        if gid == 0 {
            return None;
        }
        let tileset = self
            .tilesets
            .iter()
            .filter(|tileset| tileset.first_gid <= gid)
            .max_by_key(|tileset| tileset.first_gid)?;
        let image = tileset.image.as_ref()?;
        let local = gid - tileset.first_gid;
        let columns = tileset.columns.max(1);
        Some((
            image,
            (local % columns) * self.tile_width,
            (local / columns) * self.tile_height,
            self.tile_width,
            self.tile_height,
        ))
    }
}

/// Reads a TMX file. External `.tsx` tilesets are resolved relative to the
/// map file.
pub fn load_tmx(path: &Path) -> Result<TmxMap, TmxError> {
    let raw = read_file(path)?;
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    parse_tmx_with(&path.display().to_string(), &raw, |source| {
        let tsx_path = base_dir.join(source);
        let raw = read_file(&tsx_path)?;
        Ok((tsx_path.display().to_string(), raw))
    })
}

/// Parses TMX text with no external tileset support.
pub fn parse_tmx(file_label: &str, raw: &str) -> Result<TmxMap, TmxError> {
    parse_tmx_with(file_label, raw, |source| {
        Err(TmxError::Invalid {
            file: file_label.to_string(),
            message: format!("external tileset '{source}' cannot be resolved here"),
            location: SourceLocation { line: 1, column: 1 },
        })
    })
}

fn read_file(path: &Path) -> Result<String, TmxError> {
    fs::read_to_string(path).map_err(|source| TmxError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_tmx_with<F>(file: &str, raw: &str, mut resolve_tsx: F) -> Result<TmxMap, TmxError>
where
    F: FnMut(&str) -> Result<(String, String), TmxError>,
{
    let doc = parse_document(file, raw)?;
    let ctx = NodeContext { file, doc: &doc };
    let root = doc.root_element();
    if root.tag_name().name() != "map" {
        return Err(ctx.invalid(root, "root element must be <map>"));
    }
    let orientation = root.attribute("orientation").unwrap_or("orthogonal");
    if orientation != "orthogonal" {
        return Err(ctx.invalid(
            root,
            format!("unsupported orientation '{orientation}'; only orthogonal maps load"),
        ));
    }

    let mut map = TmxMap {
        width: ctx.required_u32(root, "width")?,
        height: ctx.required_u32(root, "height")?,
        tile_width: ctx.required_u32(root, "tilewidth")?,
        tile_height: ctx.required_u32(root, "tileheight")?,
        properties: Properties::new(),
        tilesets: Vec::new(),
        layers: Vec::new(),
        object_groups: Vec::new(),
    };
    if map.tile_width == 0 || map.tile_height == 0 {
        return Err(ctx.invalid(root, "tile dimensions must be positive"));
    }

    for child in root.children().filter(|node| node.is_element()) {
        match child.tag_name().name() {
            "properties" => map.properties = ctx.properties(child)?,
            "tileset" => {
                let first_gid = ctx.required_u32(child, "firstgid")?;
                let tileset = match child.attribute("source") {
                    Some(source) => {
                        let (tsx_file, tsx_raw) = resolve_tsx(source)?;
                        let tsx_doc = parse_document(&tsx_file, &tsx_raw)?;
                        let tsx_ctx = NodeContext {
                            file: &tsx_file,
                            doc: &tsx_doc,
                        };
                        tsx_ctx.tileset(tsx_doc.root_element(), first_gid)?
                    }
                    None => ctx.tileset(child, first_gid)?,
                };
                map.tilesets.push(tileset);
            }
            "layer" => map.layers.push(ctx.tile_layer(child)?),
            "objectgroup" => map.object_groups.push(ctx.object_group(child)?),
            _ => {}
        }
    }

    Ok(map)
}

fn parse_document<'input>(file: &str, raw: &'input str) -> Result<Document<'input>, TmxError> {
    Document::parse(raw).map_err(|error| TmxError::Malformed {
        file: file.to_string(),
        message: error.to_string(),
        location: SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        },
    })
}

struct NodeContext<'a, 'input> {
    file: &'a str,
    doc: &'a Document<'input>,
}

impl<'a, 'input> NodeContext<'a, 'input> {
    fn invalid(&self, node: Node<'_, '_>, message: impl Into<String>) -> TmxError {
        let pos = self.doc.text_pos_at(node.range().start);
        TmxError::Invalid {
            file: self.file.to_string(),
            message: message.into(),
            location: SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            },
        }
    }

    fn required_u32(&self, node: Node<'_, '_>, name: &str) -> Result<u32, TmxError> {
        let value = node.attribute(name).ok_or_else(|| {
            self.invalid(
                node,
                format!("<{}> is missing attribute '{name}'", node.tag_name().name()),
            )
        })?;
        value.trim().parse::<u32>().map_err(|_| {
            self.invalid(
                node,
                format!("attribute '{name}' must be a non-negative integer, got '{value}'"),
            )
        })
    }

    fn optional_u32(&self, node: Node<'_, '_>, name: &str) -> Result<Option<u32>, TmxError> {
        match node.attribute(name) {
            Some(_) => self.required_u32(node, name).map(Some),
            None => Ok(None),
        }
    }

    fn optional_f32(&self, node: Node<'_, '_>, name: &str) -> Result<f32, TmxError> {
        let Some(value) = node.attribute(name) else {
            return Ok(0.0);
        };
        match value.trim().parse::<f32>() {
            Ok(parsed) if parsed.is_finite() => Ok(parsed),
            _ => Err(self.invalid(
                node,
                format!("attribute '{name}' must be a finite number, got '{value}'"),
            )),
        }
    }

    fn properties(&self, node: Node<'_, '_>) -> Result<Properties, TmxError> {
        let mut properties = Properties::new();
        for property in node
            .children()
            .filter(|child| child.has_tag_name("property"))
        {
            let name = property
                .attribute("name")
                .ok_or_else(|| self.invalid(property, "<property> is missing 'name'"))?;
            let value = property
                .attribute("value")
                .map(str::to_string)
                .or_else(|| property.text().map(|text| text.trim().to_string()))
                .unwrap_or_default();
            properties.insert(name.to_string(), value);
        }
        Ok(properties)
    }

    fn properties_of(&self, node: Node<'_, '_>) -> Result<Properties, TmxError> {
        match node.children().find(|child| child.has_tag_name("properties")) {
            Some(properties) => self.properties(properties),
            None => Ok(Properties::new()),
        }
    }

    fn tileset(&self, node: Node<'_, '_>, first_gid: u32) -> Result<TmxTileset, TmxError> {
        if node.tag_name().name() != "tileset" {
            return Err(self.invalid(node, "expected a <tileset> element"));
        }
        let mut tileset = TmxTileset {
            first_gid,
            name: node.attribute("name").unwrap_or_default().to_string(),
            columns: self.optional_u32(node, "columns")?.unwrap_or(0),
            tile_count: self.optional_u32(node, "tilecount")?.unwrap_or(0),
            image: None,
            tile_properties: BTreeMap::new(),
        };
        for child in node.children().filter(|child| child.is_element()) {
            match child.tag_name().name() {
                "image" => {
                    tileset.image = Some(TmxImage {
                        source: child
                            .attribute("source")
                            .ok_or_else(|| self.invalid(child, "<image> is missing 'source'"))?
                            .to_string(),
                        width: self.optional_u32(child, "width")?.unwrap_or(0),
                        height: self.optional_u32(child, "height")?.unwrap_or(0),
                    });
                }
                "tile" => {
                    let id = self.required_u32(child, "id")?;
                    let properties = self.properties_of(child)?;
                    if !properties.is_empty() {
                        tileset.tile_properties.insert(id, properties);
                    }
                }
                _ => {}
            }
        }
        Ok(tileset)
    }

    fn tile_layer(&self, node: Node<'_, '_>) -> Result<TmxTileLayer, TmxError> {
        let width = self.required_u32(node, "width")?;
        let height = self.required_u32(node, "height")?;
        let data = node
            .children()
            .find(|child| child.has_tag_name("data"))
            .ok_or_else(|| self.invalid(node, "<layer> has no <data>"))?;
        let gids = match data.attribute("encoding") {
            Some("csv") => self.csv_gids(data)?,
            None => data
                .children()
                .filter(|child| child.has_tag_name("tile"))
                .map(|tile| self.optional_u32(tile, "gid").map(Option::unwrap_or_default))
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(self.invalid(
                    data,
                    format!("unsupported layer encoding '{other}'; save the map with CSV"),
                ))
            }
        };
        let expected = width as usize * height as usize;
        if gids.len() != expected {
            return Err(self.invalid(
                data,
                format!("layer has {} tiles, expected {expected}", gids.len()),
            ));
        }
        Ok(TmxTileLayer {
            name: node.attribute("name").unwrap_or_default().to_string(),
            width,
            height,
            visible: node.attribute("visible") != Some("0"),
            properties: self.properties_of(node)?,
            gids,
        })
    }

    fn csv_gids(&self, data: Node<'_, '_>) -> Result<Vec<u32>, TmxError> {
        let text = data.text().unwrap_or_default();
        text.split(',')
            .map(str::trim)
            .filter(|cell| !cell.is_empty())
            .map(|cell| {
                cell.parse::<u32>()
                    .map_err(|_| self.invalid(data, format!("invalid tile id '{cell}' in CSV data")))
            })
            .collect()
    }

    fn object_group(&self, node: Node<'_, '_>) -> Result<TmxObjectGroup, TmxError> {
        let mut objects = Vec::new();
        for object in node.children().filter(|child| child.has_tag_name("object")) {
            objects.push(TmxObject {
                id: self.optional_u32(object, "id")?.unwrap_or(0),
                name: object.attribute("name").unwrap_or_default().to_string(),
                class: object
                    .attribute("type")
                    .or_else(|| object.attribute("class"))
                    .unwrap_or_default()
                    .to_string(),
                x: self.optional_f32(object, "x")?,
                y: self.optional_f32(object, "y")?,
                width: self.optional_f32(object, "width")?,
                height: self.optional_f32(object, "height")?,
                properties: self.properties_of(object)?,
            });
        }
        Ok(TmxObjectGroup {
            name: node.attribute("name").unwrap_or_default().to_string(),
            objects,
        })
    }
}
