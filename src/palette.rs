//! Named continuous color scales offered in the palette dropdown.

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Palette {
    #[default]
    Viridis,
    Cividis,
    Inferno,
    Plasma,
    Magma,
    Jet,
    Rainbow,
    Blues,
    Greens,
    Reds,
    Purples,
}

impl Palette {
    pub const ALL: [Palette; 11] = [
        Palette::Viridis,
        Palette::Cividis,
        Palette::Inferno,
        Palette::Plasma,
        Palette::Magma,
        Palette::Jet,
        Palette::Rainbow,
        Palette::Blues,
        Palette::Greens,
        Palette::Reds,
        Palette::Purples,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Palette::Viridis => "Viridis",
            Palette::Cividis => "Cividis",
            Palette::Inferno => "Inferno",
            Palette::Plasma => "Plasma",
            Palette::Magma => "Magma",
            Palette::Jet => "Jet",
            Palette::Rainbow => "Rainbow",
            Palette::Blues => "Blues",
            Palette::Greens => "Greens",
            Palette::Reds => "Reds",
            Palette::Purples => "Purples",
        }
    }

    /// Evenly spaced color stops, low to high.
    pub fn colors(self) -> &'static [&'static str] {
        match self {
            Palette::Viridis => &[
                "#440154", "#482878", "#3e4989", "#31688e", "#26828e", "#1f9e89", "#35b779",
                "#6ece58", "#b5de2b", "#fde725",
            ],
            Palette::Cividis => &[
                "#00224e", "#123570", "#3b496c", "#575d6d", "#707173", "#8a8678", "#a59c74",
                "#c3b369", "#e1cc55", "#fee838",
            ],
            Palette::Inferno => &[
                "#000004", "#1b0c41", "#4a0c6b", "#781c6d", "#a52c60", "#cf4446", "#ed6925",
                "#fb9b06", "#f7d13d", "#fcffa4",
            ],
            Palette::Plasma => &[
                "#0d0887", "#46039f", "#7201a8", "#9c179e", "#bd3786", "#d8576b", "#ed7953",
                "#fb9f3a", "#fdca26", "#f0f921",
            ],
            Palette::Magma => &[
                "#000004", "#180f3d", "#440f76", "#721f81", "#9e2f7f", "#cd4071", "#f1605d",
                "#fd9668", "#feca8d", "#fcfdbf",
            ],
            Palette::Jet => &[
                "rgb(0,0,131)",
                "rgb(0,60,170)",
                "rgb(5,255,255)",
                "rgb(255,255,0)",
                "rgb(250,0,0)",
                "rgb(128,0,0)",
            ],
            Palette::Rainbow => &[
                "rgb(150,0,90)",
                "rgb(0,0,200)",
                "rgb(0,25,255)",
                "rgb(0,152,255)",
                "rgb(44,255,150)",
                "rgb(151,255,0)",
                "rgb(255,234,0)",
                "rgb(255,111,0)",
                "rgb(255,0,0)",
            ],
            Palette::Blues => &[
                "rgb(247,251,255)",
                "rgb(222,235,247)",
                "rgb(198,219,239)",
                "rgb(158,202,225)",
                "rgb(107,174,214)",
                "rgb(66,146,198)",
                "rgb(33,113,181)",
                "rgb(8,81,156)",
                "rgb(8,48,107)",
            ],
            Palette::Greens => &[
                "rgb(247,252,245)",
                "rgb(229,245,224)",
                "rgb(199,233,192)",
                "rgb(161,217,155)",
                "rgb(116,196,118)",
                "rgb(65,171,93)",
                "rgb(35,139,69)",
                "rgb(0,109,44)",
                "rgb(0,68,27)",
            ],
            Palette::Reds => &[
                "rgb(255,245,240)",
                "rgb(254,224,210)",
                "rgb(252,187,161)",
                "rgb(252,146,114)",
                "rgb(251,106,74)",
                "rgb(239,59,44)",
                "rgb(203,24,29)",
                "rgb(165,15,21)",
                "rgb(103,0,13)",
            ],
            Palette::Purples => &[
                "rgb(252,251,253)",
                "rgb(239,237,245)",
                "rgb(218,218,235)",
                "rgb(188,189,220)",
                "rgb(158,154,200)",
                "rgb(128,125,186)",
                "rgb(106,81,163)",
                "rgb(84,39,143)",
                "rgb(63,0,125)",
            ],
        }
    }

    /// Nearest stop at position `t` in `[0, 1]`.
    pub fn sample(self, t: f64) -> &'static str {
        let colors = self.colors();
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let idx = (t * (colors.len() - 1) as f64).round() as usize;
        colors[idx.min(colors.len() - 1)]
    }

    /// `count` colors spread evenly over the scale.
    pub fn spread(self, count: usize) -> Vec<&'static str> {
        match count {
            0 => Vec::new(),
            1 => vec![self.sample(0.5)],
            n => (0..n)
                .map(|i| self.sample(i as f64 / (n - 1) as f64))
                .collect(),
        }
    }

    pub fn scale(self) -> ColorScale {
        ColorScale(self)
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Palette {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Palette::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| format!("Unknown palette: {}", s))
    }
}

/// A palette written out as `[[position, color], ...]` for the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorScale(pub Palette);

impl Serialize for ColorScale {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let colors = self.0.colors();
        let last = (colors.len() - 1) as f64;
        let mut seq = serializer.serialize_seq(Some(colors.len()))?;
        for (i, color) in colors.iter().enumerate() {
            seq.serialize_element(&(i as f64 / last, color))?;
        }
        seq.end()
    }
}
