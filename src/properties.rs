//! [crate::properties] contains the basic value types shared by the extractors and the
//! [crate::web::Web]: scanned [Track]s, the [Benchmark] ordering used to disambiguate titles, and
//! the derived visual attributes of a snapshot.
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// One musical work as scanned from a source: a title and the ordered titles it references.
///
/// A track with an empty title is null and never reaches a [crate::web::Web].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    #[serde(default)]
    pub references: Vec<String>,
}

impl Track {
    pub fn new<S: Into<String>>(title: S) -> Self {
        Track {
            title: title.into(),
            references: Vec::new(),
        }
    }

    pub fn with_references<S, I, R>(title: S, references: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Track {
            title: title.into(),
            references: references.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.title.is_empty()
    }
}

impl Display for Track {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Track(\"{}\", {:?})", self.title, self.references)
    }
}

/// How far through a document parsing has progressed, used to tell apart works that share a
/// title. Benchmarks only ever advance while a single document is scanned.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Benchmark(pub u16);

impl Benchmark {
    pub const NONE: Benchmark = Benchmark(0);
    /// The "unreleased or removed songs" section of a listing.
    pub const UNRELEASED: Benchmark = Benchmark(998);
    /// The trailing section of songs from outside the canon.
    pub const NON_HOMESTUCK: Benchmark = Benchmark(999);

    /// Returns the later of the two benchmarks.
    pub fn advance(self, to: Benchmark) -> Benchmark {
        self.max(to)
    }
}

impl Display for Benchmark {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            Benchmark::NONE => write!(f, "NONE"),
            Benchmark::UNRELEASED => write!(f, "UNRELEASED"),
            Benchmark::NON_HOMESTUCK => write!(f, "NON_HOMESTUCK"),
            Benchmark(n) => write!(f, "{n}"),
        }
    }
}

/// Which weighted degree drives node size in a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SizeBasis {
    /// Size by how often a track is referenced.
    #[default]
    InDegree,
    /// Size by how many references a track makes.
    OutDegree,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Converts a hue/saturation/value triple (each in `[0, 1]`) to RGB.
    pub fn from_hsv(hue: f64, saturation: f64, value: f64) -> Rgb {
        let h = (hue.rem_euclid(1.0)) * 6.0;
        let sector = h.floor();
        let f = h - sector;
        let p = value * (1.0 - saturation);
        let q = value * (1.0 - saturation * f);
        let t = value * (1.0 - saturation * (1.0 - f));
        let (r, g, b) = match sector as u8 {
            0 => (value, t, p),
            1 => (q, value, p),
            2 => (p, value, t),
            3 => (p, q, value),
            4 => (t, p, value),
            _ => (value, p, q),
        };
        let to_byte = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgb(to_byte(r), to_byte(g), to_byte(b))
    }
}

impl From<[u8; 3]> for Rgb {
    fn from(rgb: [u8; 3]) -> Self {
        Rgb(rgb[0], rgb[1], rgb[2])
    }
}
