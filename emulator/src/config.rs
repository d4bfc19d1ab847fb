use std::path::{Path, PathBuf};
use toml::value::{Table, Value};

static CONFIG_FILE_PATHS: &[(bool, &str)] = &[
    (true, ".config/r65816/config.toml"),
    (true, ".config/r65816.toml"),
    (false, "/etc/r65816.toml"),
];

#[derive(Debug)]
pub enum ConfigLoadError {
    Io(std::io::Error),
    De(toml::de::Error),
    WrongType {
        expected: &'static str,
        got: &'static str,
    },
    UnknownField(String),
    OutOfRange {
        field: &'static str,
        value: i64,
    },
}

impl From<std::io::Error> for ConfigLoadError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl std::fmt::Display for ConfigLoadError {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(fmt, "unable to read config file ({err})"),
            Self::De(err) => write!(fmt, "config file parsing error: {err}"),
            Self::WrongType { expected, got } => {
                write!(fmt, "expected type `{expected}`, got `{got}`")
            }
            Self::UnknownField(field) => {
                write!(fmt, "unknown field `{field}`")
            }
            Self::OutOfRange { field, value } => {
                write!(fmt, "value {value:#x} out of range for field `{field}`")
            }
        }
    }
}

impl std::error::Error for ConfigLoadError {}

macro_rules! getval {
    ($val:expr, $ty:ident) => {
        match $val {
            Value::$ty(val) => Ok(val),
            val => Err(ConfigLoadError::WrongType {
                expected: stringify!($ty),
                got: val.type_str(),
            }),
        }
    };
}

/// The machine description the frontend builds the device from
#[derive(Debug, Clone)]
pub struct Config {
    /// RAM regions as (24-bit start address, length)
    pub ram: Vec<(u32, u32)>,
    /// 24-bit address the program image is installed at
    pub image_base: u32,
    /// breakpoint addresses, 24-bit
    pub breakpoints: Vec<u32>,
    /// master-cycle budget per run slice
    pub budget: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ram: vec![(0, 0x2000)],
            image_base: 0x8000,
            breakpoints: vec![],
            budget: 1_000_000,
        }
    }
}

fn addr24(field: &'static str, value: i64) -> Result<u32, ConfigLoadError> {
    if (0..0x100_0000).contains(&value) {
        Ok(value as u32)
    } else {
        Err(ConfigLoadError::OutOfRange { field, value })
    }
}

impl Config {
    fn from_table(table: Table) -> Result<Self, ConfigLoadError> {
        let mut config = Self::default();
        for (key, value) in table {
            match key.as_str() {
                "ram" => {
                    config.ram.clear();
                    for region in getval!(value, Array)? {
                        let pair = getval!(region, Array)?;
                        let mut ints = pair.into_iter().map(|v| getval!(v, Integer));
                        let start = addr24("ram", ints.next().transpose()?.unwrap_or(0))?;
                        let len = addr24("ram", ints.next().transpose()?.unwrap_or(0))?;
                        config.ram.push((start, len));
                    }
                }
                "image-base" => {
                    config.image_base = addr24("image-base", getval!(value, Integer)?)?
                }
                "breakpoints" => {
                    for bp in getval!(value, Array)? {
                        config
                            .breakpoints
                            .push(addr24("breakpoints", getval!(bp, Integer)?)?);
                    }
                }
                "budget" => {
                    let val = getval!(value, Integer)?;
                    config.budget = u32::try_from(val)
                        .map_err(|_| ConfigLoadError::OutOfRange { field: "budget", value: val })?;
                }
                _ => return Err(ConfigLoadError::UnknownField(key)),
            }
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigLoadError> {
        let content = std::fs::read_to_string(path)?;
        let table = content.parse::<Value>().map_err(ConfigLoadError::De)?;
        Self::from_table(getval!(table, Table)?)
    }

    /// Load the first config file found in the well-known locations, or
    /// the defaults when none exists
    pub fn load_default_locations() -> Result<Self, ConfigLoadError> {
        let home = std::env::var_os("HOME").map(PathBuf::from);
        for (in_home, path) in CONFIG_FILE_PATHS {
            let path = if *in_home {
                match &home {
                    Some(home) => home.join(path),
                    None => continue,
                }
            } else {
                PathBuf::from(path)
            };
            if path.is_file() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }
}
