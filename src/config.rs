// Command line configuration.

use std::path::PathBuf;

use clap::{App, Arg, ArgMatches};

use crate::error::Error;
use crate::lut::IDENTITY;

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub background: Option<PathBuf>,
    pub luts: Vec<PathBuf>,
    pub select: String,
    pub width: usize,
    pub height: usize,
    pub scene: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            background: None,
            luts: Vec::new(),
            select: IDENTITY.to_string(),
            width: 960,
            height: 540,
            scene: true,
        }
    }
}

fn app() -> App<'static, 'static> {
    App::new("LUT Grade")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Composites a photo plate and a 3D scene, then color grades it with a 3D LUT")
        .arg(
            Arg::with_name("background")
                .short("b")
                .long("background")
                .value_name("FILE")
                .help("Background photo (PNG or JPEG)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("lut")
                .short("l")
                .long("lut")
                .value_name("FILE")
                .help("LUT atlas image, N*N wide and N tall (repeatable)")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1),
        )
        .arg(
            Arg::with_name("select")
                .short("s")
                .long("select")
                .value_name("NAME")
                .help("LUT active at startup")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("width")
                .long("width")
                .value_name("PIXELS")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("height")
                .long("height")
                .value_name("PIXELS")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("no-scene")
                .long("no-scene")
                .help("Skip the demo cube; show only the graded background"),
        )
}

fn parse_size(matches: &ArgMatches, name: &str, default: usize) -> Result<usize, Error> {
    match matches.value_of(name) {
        None => Ok(default),
        Some(v) => match v.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(Error::Config(format!("--{name} must be a positive integer, got '{v}'"))),
        },
    }
}

impl Config {
    pub fn from_args() -> Result<Self, Error> {
        Self::from_matches(&app().get_matches())
    }

    pub fn parse_from<I, T>(args: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = app()
            .get_matches_from_safe(args)
            .map_err(|e| Error::Config(e.to_string()))?;
        Self::from_matches(&matches)
    }

    fn from_matches(matches: &ArgMatches) -> Result<Self, Error> {
        let defaults = Self::default();
        Ok(Self {
            background: matches.value_of("background").map(PathBuf::from),
            luts: matches
                .values_of("lut")
                .map(|vs| vs.map(PathBuf::from).collect())
                .unwrap_or_default(),
            select: matches.value_of("select").map(str::to_string).unwrap_or(defaults.select),
            width: parse_size(matches, "width", defaults.width)?,
            height: parse_size(matches, "height", defaults.height)?,
            scene: !matches.is_present("no-scene"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_flags() {
        let c = Config::parse_from(["lut-grade"]).unwrap();
        assert_eq!(c, Config::default());
    }

    #[test]
    fn parses_every_flag() {
        let c = Config::parse_from([
            "lut-grade", "-b", "beach.jpg", "--lut", "a.png", "--lut", "b.png",
            "--select", "a", "--width", "640", "--height", "480", "--no-scene",
        ])
        .unwrap();
        assert_eq!(c.background, Some(PathBuf::from("beach.jpg")));
        assert_eq!(c.luts, vec![PathBuf::from("a.png"), PathBuf::from("b.png")]);
        assert_eq!(c.select, "a");
        assert_eq!((c.width, c.height), (640, 480));
        assert!(!c.scene);
    }

    #[test]
    fn rejects_zero_size() {
        assert!(Config::parse_from(["lut-grade", "--width", "0"]).is_err());
        assert!(Config::parse_from(["lut-grade", "--height", "tall"]).is_err());
    }
}
