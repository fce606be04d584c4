//! Fixed Grailed taxonomy tables.
//!
//! These mirror the values the site's listing form accepts. They are data,
//! not configuration: changing them means the site changed its contract.

/// Departments accepted verbatim. Matching is exact and case-sensitive;
/// `"menswear"` is a different (invalid) value from `"Menswear"`.
pub const DEPARTMENTS: [&str; 2] = ["Menswear", "Womenswear"];

/// Conditions in the site's canonical title case. Input is matched
/// case-insensitively and normalized to these spellings.
pub const CONDITIONS: [&str; 5] = ["Brand New", "Like New", "Gently Used", "Used", "Very Worn"];

/// Canonical color palette. Off-palette input is mapped by substring
/// containment where possible, otherwise passed through with a warning.
pub const COLORS: [&str; 15] = [
    "Black",
    "White",
    "Grey",
    "Navy",
    "Blue",
    "Red",
    "Green",
    "Brown",
    "Beige",
    "Pink",
    "Purple",
    "Yellow",
    "Orange",
    "Multicolor",
    "Indigo",
];

/// Fields a record must have before it can be submitted at all.
pub const REQUIRED_FIELDS: [&str; 2] = ["image_paths", "price"];

/// Metadata fields the preflight report checks for; absence here is
/// informational, not an error.
pub const METADATA_FIELDS: [&str; 9] = [
    "department",
    "category",
    "sub_category",
    "designer",
    "item_name",
    "size",
    "color",
    "condition",
    "description",
];

/// Image formats the site's uploader accepts, for the strict format check.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "heic"];
