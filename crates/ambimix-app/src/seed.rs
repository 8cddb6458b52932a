//! Built-in sound catalog.

use ambimix_core::{Result, SoundCatalog};

/// Extension shared by every shipped sound.
pub const BUILTIN_EXTENSION: &str = "m4a";

/// `(title, file name, category)` in shipped order.
pub const BUILTIN_SOUNDS: &[(&str, &str, &str)] = &[
    ("Rain", "rain", "nature"),
    ("Waves", "waves", "nature"),
    ("Fireplace", "fireplace", "home"),
    ("Forest", "forest", "nature"),
    ("Wind", "wind", "nature"),
    ("Stream", "stream", "nature"),
    ("Thunder", "thunder", "nature"),
    ("Birds", "birds", "nature"),
    ("Night", "night", "nature"),
    ("Cafe", "cafe", "places"),
    ("Train", "train", "places"),
    ("Road", "road", "places"),
    ("White Noise", "white-noise", "noise"),
    ("Brown Noise", "brown-noise", "noise"),
];

pub fn builtin_catalog() -> Result<SoundCatalog> {
    let mut catalog = SoundCatalog::new();
    for (title, file_name, category) in BUILTIN_SOUNDS {
        catalog.add_builtin(*title, *file_name, BUILTIN_EXTENSION, *category)?;
    }
    Ok(catalog)
}
