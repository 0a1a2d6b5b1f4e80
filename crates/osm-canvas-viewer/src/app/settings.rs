use clap::Parser;
use osm_canvas_lib::{Color, Config, Style};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// OSM Canvas Viewer - Browse the nodes and ways of an OpenStreetMap JSON export
pub struct Settings {
    /// OSM JSON file (Overpass `{"elements": [...]}` or a bare element array) to load on startup
    #[clap(short, long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Node radius in pixels (1-10)
    #[clap(long, default_value = "2.0")]
    pub node_size: f64,

    /// Way stroke width in pixels (1-10)
    #[clap(long, default_value = "2.0")]
    pub way_width: f64,

    /// Node fill color as #rrggbb
    #[clap(long, default_value = "#ff0000", value_parser = parse_color)]
    pub node_color: Color,

    /// Way stroke color as #rrggbb
    #[clap(long, default_value = "#0000ff", value_parser = parse_color)]
    pub way_color: Color,

    /// Only label the selected node
    #[clap(long, default_value = "false")]
    pub hide_labels: bool,

    /// Spatial grid cell size in pixels (at least 20)
    #[clap(long, default_value = "50.0", value_parser = parse_cell_size)]
    pub cell_size: f64,

    /// Blank margin around the data in pixels
    #[clap(long, default_value = "50.0")]
    pub padding: f64,

    /// Ignore previously persisted state and start fresh
    #[clap(long, default_value = "false")]
    pub ignore_persisted: bool,
}

fn parse_color(value: &str) -> Result<Color, String> {
    Color::from_hex(value).ok_or_else(|| format!("invalid color {:?}, expected #rrggbb", value))
}

fn parse_cell_size(value: &str) -> Result<f64, String> {
    let size: f64 = value
        .parse()
        .map_err(|_| format!("invalid cell size {:?}", value))?;
    if size.is_finite() && size >= Config::MIN_CELL_SIZE {
        Ok(size)
    } else {
        Err(format!(
            "cell size must be at least {} pixels",
            Config::MIN_CELL_SIZE
        ))
    }
}

impl Settings {
    /// Parse the process arguments, exiting with usage on error
    pub fn from_cli() -> Self {
        match Settings::try_parse() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    /// Engine configuration derived from the flags
    pub fn to_config(&self) -> Config {
        Config {
            cell_size: self.cell_size,
            padding: self.padding,
            ..Config::default()
        }
    }

    /// Initial drawing style derived from the flags
    pub fn to_style(&self) -> Style {
        let mut style = Style {
            node_color: self.node_color,
            way_color: self.way_color,
            show_labels: !self.hide_labels,
            ..Style::default()
        };
        style.set_node_size(self.node_size);
        style.set_way_width(self.way_width);
        style
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_defaults() {
        let settings = Settings::try_parse_from(["osm-canvas-viewer"]).unwrap();
        assert!(settings.file.is_none());
        assert_eq!(settings.to_style(), Style::default());
        let config = settings.to_config();
        assert_eq!(config.cell_size, Config::default().cell_size);
        assert_eq!(config.padding, Config::default().padding);
    }

    #[test]
    fn test_style_flags_are_clamped() {
        let settings = Settings::try_parse_from([
            "osm-canvas-viewer",
            "--file",
            "city.json",
            "--node-size",
            "25",
            "--way-color",
            "#00ff00",
            "--hide-labels",
        ])
        .unwrap();
        let style = settings.to_style();
        assert_eq!(settings.file, Some(PathBuf::from("city.json")));
        assert_eq!(style.node_size, Style::MAX_NODE_SIZE);
        assert_eq!(style.way_color, Color::rgb(0, 255, 0));
        assert!(!style.show_labels);
    }

    #[test]
    fn test_cell_size_below_hit_distance_is_rejected() {
        for bad in ["0", "-5", "19.5", "NaN", "inf", "wide"] {
            assert!(
                Settings::try_parse_from(["osm-canvas-viewer", "--cell-size", bad]).is_err(),
                "{bad}"
            );
        }
        let settings =
            Settings::try_parse_from(["osm-canvas-viewer", "--cell-size", "20"]).unwrap();
        assert_eq!(settings.to_config().cell_size, Config::MIN_CELL_SIZE);
    }

    #[test]
    fn test_invalid_color_is_rejected() {
        assert!(Settings::try_parse_from(["osm-canvas-viewer", "--node-color", "red"]).is_err());
    }
}
