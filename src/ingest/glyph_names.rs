//! Glyph-name to Unicode fallback table.
//!
//! Fonts with missing or broken encodings still carry meaningful glyph
//! names. This table maps the common Adobe glyph names (plus the display
//! variants used by math fonts) to code points, and is consulted when a
//! character-draw event carries no usable Unicode data.

use phf::phf_map;

static GLYPH_NAMES: phf::Map<&'static str, u32> = phf_map! {
    // Punctuation and symbols
    "space" => 0x0020,
    "exclam" => 0x0021,
    "quotedbl" => 0x0022,
    "numbersign" => 0x0023,
    "dollar" => 0x0024,
    "percent" => 0x0025,
    "ampersand" => 0x0026,
    "quotesingle" => 0x0027,
    "parenleft" => 0x0028,
    "parenright" => 0x0029,
    "asterisk" => 0x002A,
    "plus" => 0x002B,
    "comma" => 0x002C,
    "hyphen" => 0x002D,
    "period" => 0x002E,
    "slash" => 0x002F,
    "colon" => 0x003A,
    "semicolon" => 0x003B,
    "less" => 0x003C,
    "equal" => 0x003D,
    "greater" => 0x003E,
    "question" => 0x003F,
    "at" => 0x0040,
    "bracketleft" => 0x005B,
    "backslash" => 0x005C,
    "bracketright" => 0x005D,
    "asciicircum" => 0x005E,
    "underscore" => 0x005F,
    "grave" => 0x0060,
    "braceleft" => 0x007B,
    "bar" => 0x007C,
    "braceright" => 0x007D,
    "asciitilde" => 0x007E,
    "exclamdown" => 0x00A1,
    "cent" => 0x00A2,
    "sterling" => 0x00A3,
    "yen" => 0x00A5,
    "section" => 0x00A7,
    "dieresis" => 0x00A8,
    "copyright" => 0x00A9,
    "guillemotleft" => 0x00AB,
    "registered" => 0x00AE,
    "macron" => 0x00AF,
    "degree" => 0x00B0,
    "plusminus" => 0x00B1,
    "acute" => 0x00B4,
    "mu" => 0x00B5,
    "paragraph" => 0x00B6,
    "periodcentered" => 0x00B7,
    "cedilla" => 0x00B8,
    "guillemotright" => 0x00BB,
    "questiondown" => 0x00BF,
    "multiply" => 0x00D7,
    "divide" => 0x00F7,
    // Digits
    "zero" => 0x0030,
    "one" => 0x0031,
    "two" => 0x0032,
    "three" => 0x0033,
    "four" => 0x0034,
    "five" => 0x0035,
    "six" => 0x0036,
    "seven" => 0x0037,
    "eight" => 0x0038,
    "nine" => 0x0039,
    // Dashes and quotes
    "endash" => 0x2013,
    "emdash" => 0x2014,
    "quoteleft" => 0x2018,
    "quoteright" => 0x2019,
    "quotesinglbase" => 0x201A,
    "quotedblleft" => 0x201C,
    "quotedblright" => 0x201D,
    "quotedblbase" => 0x201E,
    "dagger" => 0x2020,
    "daggerdbl" => 0x2021,
    "bullet" => 0x2022,
    "ellipsis" => 0x2026,
    "perthousand" => 0x2030,
    "guilsinglleft" => 0x2039,
    "guilsinglright" => 0x203A,
    "fraction" => 0x2044,
    "euro" => 0x20AC,
    "trademark" => 0x2122,
    "minus" => 0x2212,
    // Ligatures
    "fi" => 0xFB01,
    "fl" => 0xFB02,
    "ff" => 0xFB00,
    "ffi" => 0xFB03,
    "ffl" => 0xFB04,
    // Accented-letter building blocks
    "circumflex" => 0x02C6,
    "caron" => 0x02C7,
    "breve" => 0x02D8,
    "dotaccent" => 0x02D9,
    "ring" => 0x02DA,
    "ogonek" => 0x02DB,
    "tilde" => 0x02DC,
    "hungarumlaut" => 0x02DD,
    "dotlessi" => 0x0131,
    "germandbls" => 0x00DF,
    "ae" => 0x00E6,
    "AE" => 0x00C6,
    "oe" => 0x0153,
    "OE" => 0x0152,
    "oslash" => 0x00F8,
    "Oslash" => 0x00D8,
    // Greek (lowercase)
    "alpha" => 0x03B1,
    "beta" => 0x03B2,
    "gamma" => 0x03B3,
    "delta" => 0x03B4,
    "epsilon" => 0x03B5,
    "zeta" => 0x03B6,
    "eta" => 0x03B7,
    "theta" => 0x03B8,
    "iota" => 0x03B9,
    "kappa" => 0x03BA,
    "lambda" => 0x03BB,
    "nu" => 0x03BD,
    "xi" => 0x03BE,
    "pi" => 0x03C0,
    "rho" => 0x03C1,
    "sigma" => 0x03C3,
    "tau" => 0x03C4,
    "upsilon" => 0x03C5,
    "phi" => 0x03C6,
    "chi" => 0x03C7,
    "psi" => 0x03C8,
    "omega" => 0x03C9,
    // Greek (uppercase)
    "Gamma" => 0x0393,
    "Delta" => 0x0394,
    "Theta" => 0x0398,
    "Lambda" => 0x039B,
    "Xi" => 0x039E,
    "Pi" => 0x03A0,
    "Sigma" => 0x03A3,
    "Upsilon" => 0x03A5,
    "Phi" => 0x03A6,
    "Psi" => 0x03A8,
    "Omega" => 0x03A9,
    // Math operators (including the display variants of math fonts)
    "infinity" => 0x221E,
    "partialdiff" => 0x2202,
    "nabla" => 0x2207,
    "element" => 0x2208,
    "product" => 0x220F,
    "productdisplay" => 0x220F,
    "producttext" => 0x220F,
    "summation" => 0x2211,
    "summationdisplay" => 0x2211,
    "summationtext" => 0x2211,
    "integral" => 0x222B,
    "integraldisplay" => 0x222B,
    "integraltext" => 0x222B,
    "uniondisplay" => 0x22C3,
    "uniontext" => 0x22C3,
    "intersectiondisplay" => 0x22C2,
    "intersectiontext" => 0x22C2,
    "radical" => 0x221A,
    "proportional" => 0x221D,
    "approxequal" => 0x2248,
    "notequal" => 0x2260,
    "equivalence" => 0x2261,
    "lessequal" => 0x2264,
    "greaterequal" => 0x2265,
    "arrowleft" => 0x2190,
    "arrowup" => 0x2191,
    "arrowright" => 0x2192,
    "arrowdown" => 0x2193,
    "arrowdblright" => 0x21D2,
    "arrowdblboth" => 0x21D4,
};

/// Look up the Unicode code point for a glyph name.
///
/// Also handles the `uniXXXX` and `uXXXX[XX]` naming conventions.
pub fn to_unicode(glyph_name: &str) -> Option<u32> {
    if let Some(&code) = GLYPH_NAMES.get(glyph_name) {
        return Some(code);
    }

    // Single-letter names map to themselves (a-z, A-Z).
    let mut chars = glyph_name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphabetic() {
            return Some(c as u32);
        }
    }

    // "uniXXXX" names carry the code point in hex.
    if let Some(hex) = glyph_name.strip_prefix("uni") {
        if hex.len() == 4 {
            if let Ok(code) = u32::from_str_radix(hex, 16) {
                return Some(code);
            }
        }
    }

    // "uXXXX" to "uXXXXXX" names likewise.
    if let Some(hex) = glyph_name.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            if let Ok(code) = u32::from_str_radix(hex, 16) {
                return Some(code);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_glyphs() {
        assert_eq!(to_unicode("summationdisplay"), Some(0x2211));
        assert_eq!(to_unicode("fi"), Some(0xFB01));
        assert_eq!(to_unicode("alpha"), Some(0x03B1));
        assert_eq!(to_unicode("quoteright"), Some(0x2019));
    }

    #[test]
    fn test_single_letter_names() {
        assert_eq!(to_unicode("a"), Some('a' as u32));
        assert_eq!(to_unicode("Z"), Some('Z' as u32));
    }

    #[test]
    fn test_uni_names() {
        assert_eq!(to_unicode("uni0041"), Some(0x41));
        assert_eq!(to_unicode("u1D400"), Some(0x1D400));
    }

    #[test]
    fn test_unknown_names() {
        assert_eq!(to_unicode("g123"), None);
        assert_eq!(to_unicode(""), None);
        assert_eq!(to_unicode("unixyzw"), None);
    }
}
