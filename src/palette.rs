use plotters::style::RGBColor;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaletteName {
    #[default]
    Set2,
    Category10,
}

/// Ordered colour cycle for chart series.
#[derive(Debug, Clone)]
pub struct ColorPalette {
    colors: Vec<RGBColor>,
}

impl ColorPalette {
    pub fn named(name: PaletteName) -> Self {
        match name {
            PaletteName::Set2 => Self::set2(),
            PaletteName::Category10 => Self::category10(),
        }
    }

    pub fn set2() -> Self {
        Self {
            colors: vec![
                RGBColor(102, 194, 165),
                RGBColor(252, 141, 98),
                RGBColor(141, 160, 203),
                RGBColor(231, 138, 195),
                RGBColor(166, 216, 84),
                RGBColor(255, 217, 47),
                RGBColor(229, 196, 148),
                RGBColor(179, 179, 179),
            ],
        }
    }

    pub fn category10() -> Self {
        Self {
            colors: vec![
                RGBColor(31, 119, 180),
                RGBColor(255, 127, 14),
                RGBColor(44, 160, 44),
                RGBColor(214, 39, 40),
                RGBColor(148, 103, 189),
                RGBColor(140, 86, 75),
                RGBColor(227, 119, 194),
                RGBColor(127, 127, 127),
                RGBColor(188, 189, 34),
                RGBColor(23, 190, 207),
            ],
        }
    }

    /// Colour for the `index`-th series, cycling when exhausted.
    pub fn color(&self, index: usize) -> RGBColor {
        self.colors[index % self.colors.len()]
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::set2()
    }
}
