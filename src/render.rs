use crate::error::{ReportError, ReportResult};
use crate::graph::{Canvas, ChartData, ChartStyle};
use crate::palette::ColorPalette;
use crate::{OutputFormat, RenderOptions};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where rendered charts go.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputTarget {
    /// One `<key>.png` or `<key>.svg` per report in `dir`.
    Files { dir: PathBuf, format: OutputFormat },
    /// Inline SVG markup, kept in the catalog.
    Fragments,
}

/// Reference to a rendered chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactOutput {
    File(PathBuf),
    Fragment(String),
}

impl ArtifactOutput {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ArtifactOutput::File(path) => Some(path),
            ArtifactOutput::Fragment(_) => None,
        }
    }

    pub fn markup(&self) -> Option<&str> {
        match self {
            ArtifactOutput::File(_) => None,
            ArtifactOutput::Fragment(svg) => Some(svg),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    canvas: Canvas,
    palette: ColorPalette,
    target: OutputTarget,
}

impl Renderer {
    pub fn new(options: &RenderOptions, target: OutputTarget) -> ReportResult<Self> {
        let canvas = Canvas::new(options.width, options.height)
            .map_err(|e| ReportError::Config(format!("{e:#}")))?;
        if let OutputTarget::Files { dir, .. } = &target {
            std::fs::create_dir_all(dir).map_err(|e| {
                ReportError::Config(format!("cannot create output directory {}: {}", dir.display(), e))
            })?;
        }
        Ok(Self {
            canvas,
            palette: ColorPalette::named(options.palette),
            target,
        })
    }

    pub fn palette(&self) -> &ColorPalette {
        &self.palette
    }

    /// Render one chart. Files are overwritten on every run.
    pub fn render(&self, key: &str, data: &ChartData, style: &ChartStyle) -> ReportResult<ArtifactOutput> {
        match &self.target {
            OutputTarget::Fragments => Ok(ArtifactOutput::Fragment(self.canvas.render_svg(data, style)?)),
            OutputTarget::Files { dir, format } => {
                let (bytes, extension) = match format {
                    OutputFormat::Png => (self.canvas.render_png(data, style)?, "png"),
                    OutputFormat::Svg => (self.canvas.render_svg(data, style)?.into_bytes(), "svg"),
                };
                let path = dir.join(format!("{key}.{extension}"));
                std::fs::write(&path, bytes).map_err(|e| {
                    ReportError::Render(format!("failed to write {}: {}", path.display(), e))
                })?;
                debug!(path = %path.display(), "wrote chart");
                Ok(ArtifactOutput::File(path))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars() -> ChartData {
        ChartData::Bar {
            categories: vec!["2010".into(), "2011".into()],
            values: vec![13.85, 17.0],
        }
    }

    #[test]
    fn test_render_png_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("images");
        let target = OutputTarget::Files { dir: out.clone(), format: OutputFormat::Png };
        let renderer = Renderer::new(&RenderOptions::default(), target).unwrap();

        let artifact = renderer.render("bar_chart", &bars(), &ChartStyle::default()).unwrap();
        assert_eq!(artifact, ArtifactOutput::File(out.join("bar_chart.png")));
        let bytes = std::fs::read(out.join("bar_chart.png")).unwrap();
        assert_eq!(&bytes[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
    }

    #[test]
    fn test_render_svg_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = OutputTarget::Files { dir: dir.path().to_path_buf(), format: OutputFormat::Svg };
        let renderer = Renderer::new(&RenderOptions::default(), target).unwrap();

        let artifact = renderer.render("bars", &bars(), &ChartStyle::default()).unwrap();
        assert_eq!(artifact.path(), Some(dir.path().join("bars.svg").as_path()));
        let text = std::fs::read_to_string(dir.path().join("bars.svg")).unwrap();
        assert!(text.contains("<svg"));
    }

    #[test]
    fn test_render_fragment() {
        let renderer = Renderer::new(&RenderOptions::default(), OutputTarget::Fragments).unwrap();
        let artifact = renderer.render("bars", &bars(), &ChartStyle::default()).unwrap();
        assert!(artifact.markup().unwrap().starts_with("<svg"));
        assert!(artifact.path().is_none());
    }

    #[test]
    fn test_render_failure_is_render_error() {
        let renderer = Renderer::new(&RenderOptions::default(), OutputTarget::Fragments).unwrap();
        let empty = ChartData::Bar { categories: vec![], values: vec![] };
        let err = renderer.render("bars", &empty, &ChartStyle::default()).unwrap_err();
        assert!(matches!(err, ReportError::Render(_)));
    }

    #[test]
    fn test_zero_size_is_config_error() {
        let options = RenderOptions { width: 0, ..Default::default() };
        assert!(matches!(
            Renderer::new(&options, OutputTarget::Fragments),
            Err(ReportError::Config(_))
        ));
    }

    #[test]
    fn test_huge_canvas_is_config_error() {
        let options = RenderOptions { width: 40_000, height: 40_000, ..Default::default() };
        assert!(matches!(
            Renderer::new(&options, OutputTarget::Fragments),
            Err(ReportError::Config(_))
        ));
    }
}
