//! Asset type classification by file extension
//!
//! Uses the ignore crate's TypesBuilder with one file-type definition per
//! asset type. Classification is total: directories are always folders and
//! any extension missing from the table is classified as [`AssetType::OTHER`].

use crate::types::AssetType;
use ignore::types::{Types, TypesBuilder};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Extension table, lowercase, without the leading dot
const EXTENSION_TABLE: &[(AssetType, &[&str])] = &[
    (
        AssetType::TEXTURE,
        &[
            "png", "jpg", "jpeg", "tga", "psd", "bmp", "gif", "tif", "tiff", "exr", "hdr", "dds",
            "ktx", "webp",
        ],
    ),
    (AssetType::MATERIAL, &["mat", "material"]),
    (
        AssetType::MESH,
        &["fbx", "obj", "blend", "dae", "3ds", "max", "gltf", "glb", "ma", "mb"],
    ),
    (AssetType::ANIMATION, &["anim", "controller", "overridecontroller"]),
    (
        AssetType::AUDIO,
        &["wav", "mp3", "ogg", "aif", "aiff", "flac", "mod", "it", "xm"],
    ),
    (AssetType::VIDEO, &["mp4", "mov", "webm", "avi", "mkv", "m4v"]),
    (AssetType::FONT, &["ttf", "otf", "fnt", "fontsettings"]),
    (
        AssetType::SHADER,
        &["shader", "hlsl", "glsl", "cginc", "compute", "wgsl", "shadergraph"],
    ),
    (AssetType::SCRIPT, &["cs", "rs", "lua", "js", "py"]),
    (AssetType::PREFAB, &["prefab"]),
    (AssetType::SCENE, &["unity", "scene"]),
    (
        AssetType::TEXT,
        &["txt", "json", "xml", "yaml", "yml", "csv", "md", "bytes", "html"],
    ),
];

/// Detailed result of classifying one path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// The resolved asset type (always a single bit)
    pub asset_type: AssetType,
    /// Lowercased extension, if the file name has one
    pub extension: Option<String>,
    /// False when the extension was not found in the table
    pub known: bool,
}

/// Maps paths to asset types.
#[derive(Clone)]
pub struct AssetTypeClassifier {
    matchers: Arc<Vec<(AssetType, Types)>>,
}

impl AssetTypeClassifier {
    /// Creates a classifier with matchers for every entry of the extension table.
    ///
    /// If building a matcher fails, that asset type is logged and skipped.
    pub fn new() -> Self {
        let mut matchers = Vec::with_capacity(EXTENSION_TABLE.len());

        for (asset_type, extensions) in EXTENSION_TABLE {
            let Some(type_name) = asset_type.name() else {
                continue;
            };

            match build_matcher(type_name, extensions) {
                Ok(types) => matchers.push((*asset_type, types)),
                Err(e) => {
                    tracing::warn!(asset_type = type_name, error = %e, "failed to build classifier");
                }
            }
        }

        Self {
            matchers: Arc::new(matchers),
        }
    }

    /// Classifies a path; directories are always [`AssetType::FOLDER`].
    pub fn classify(&self, path: &str, is_dir: bool) -> AssetType {
        self.classify_detailed(path, is_dir).asset_type
    }

    /// Classifies a path and reports whether its extension was recognized.
    pub fn classify_detailed(&self, path: &str, is_dir: bool) -> Classification {
        if is_dir {
            return Classification {
                asset_type: AssetType::FOLDER,
                extension: None,
                known: true,
            };
        }

        let file_name = path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(path)
            .to_lowercase();
        let extension = Path::new(&file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_string);

        for (asset_type, types) in self.matchers.iter() {
            if types.matched(Path::new(&file_name), false).is_whitelist() {
                return Classification {
                    asset_type: *asset_type,
                    extension,
                    known: true,
                };
            }
        }

        tracing::debug!(path, extension = ?extension, "unrecognized extension, classified as other");
        Classification {
            asset_type: AssetType::OTHER,
            extension,
            known: false,
        }
    }
}

fn build_matcher(type_name: &str, extensions: &[&str]) -> Result<Types, ignore::Error> {
    let mut builder = TypesBuilder::new();
    for extension in extensions {
        builder.add(type_name, &format!("*.{}", extension))?;
    }
    builder.select(type_name);
    builder.build()
}

impl Default for AssetTypeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AssetTypeClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetTypeClassifier")
            .field(
                "types",
                &self.matchers.iter().map(|(t, _)| *t).collect::<Vec<_>>(),
            )
            .finish()
    }
}
