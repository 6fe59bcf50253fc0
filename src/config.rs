use clap::Parser;
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "proxyproto-listener")]
#[command(about = "Logs the endpoints carried in PROXY protocol headers", long_about = None)]
struct Args {
    /// set listen port
    #[arg(
        long = "listen-port",
        value_name = "PORT",
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    listen_port: u16,

    /// set log level, 0-debug,1-info,2-warn,3-error
    #[arg(
        long = "log-level",
        value_name = "LEVEL",
        value_parser = clap::value_parser!(u8).range(0..=3)
    )]
    log_level: Option<u8>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl LogLevel {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(LogLevel::Debug),
            1 => Some(LogLevel::Info),
            2 => Some(LogLevel::Warn),
            3 => Some(LogLevel::Error),
            _ => None,
        }
    }

    pub fn level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            LogLevel::Debug
        } else {
            LogLevel::Info
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conf {
    pub listen_port: u16,
    pub log_level: LogLevel,
}

impl Conf {
    /// Parses the process arguments, printing usage and exiting on failure.
    pub fn load() -> Self {
        Conf::from_args(Args::parse())
    }

    pub fn try_load_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Args::try_parse_from(args).map(Conf::from_args)
    }

    fn from_args(args: Args) -> Self {
        Conf {
            listen_port: args.listen_port,
            log_level: args
                .log_level
                .and_then(LogLevel::from_index)
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_and_level() {
        let conf = Conf::try_load_from(["bin", "--listen-port=8080", "--log-level=2"]).unwrap();
        assert_eq!(conf.listen_port, 8080);
        assert_eq!(conf.log_level, LogLevel::Warn);
        assert_eq!(conf.log_level.level_filter(), LevelFilter::Warn);
    }

    #[test]
    fn level_defaults_by_build() {
        let conf = Conf::try_load_from(["bin", "--listen-port", "9000"]).unwrap();
        assert_eq!(conf.log_level, LogLevel::default());
    }

    #[test]
    fn port_is_required_and_positive() {
        assert!(Conf::try_load_from(["bin"]).is_err());
        assert!(Conf::try_load_from(["bin", "--listen-port=0"]).is_err());
        assert!(Conf::try_load_from(["bin", "--listen-port=65536"]).is_err());
        assert!(Conf::try_load_from(["bin", "--listen-port=abc"]).is_err());
    }

    #[test]
    fn level_out_of_range() {
        assert!(Conf::try_load_from(["bin", "--listen-port=1", "--log-level=4"]).is_err());
        assert!(Conf::try_load_from(["bin", "--listen-port=1", "--log-level=-1"]).is_err());
    }

    #[test]
    fn level_indices() {
        assert_eq!(LogLevel::from_index(0), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_index(3), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_index(4), None);
    }
}
