//! Socket-level memory and PCIe traffic from the embedded PCM report

use regex::Regex;

use crate::Result;

const MEMORY_BANNER: &str = "Intel PCM Memory Performance Statistics";
const IO_BANNER: &str = "Intel PCM I/O Performance Statistics";
const SYSTEM_BANNER: &str = "Intel PCM System-Wide Statistics";

/// Section length assumed when the following banner is missing.
pub const SECTION_FALLBACK_BYTES: usize = 1000;

/// Traffic counters of one socket.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SocketTraffic {
    /// Read operations
    pub read: u64,
    /// Write operations
    pub write: u64,
    /// Read bandwidth, MB/s
    pub read_bw: f64,
    /// Write bandwidth, MB/s
    pub write_bw: f64,
}

/// Which PCM section to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficSection {
    /// DRAM traffic
    Memory,
    /// PCIe traffic
    Io,
}

impl TrafficSection {
    const fn banner(self) -> &'static str {
        match self {
            Self::Memory => MEMORY_BANNER,
            Self::Io => IO_BANNER,
        }
    }

    const fn next_banner(self) -> &'static str {
        match self {
            Self::Memory => IO_BANNER,
            Self::Io => SYSTEM_BANNER,
        }
    }
}

/// Reads the socket-1 row of a traffic section.
#[derive(Debug)]
pub struct TrafficParser {
    socket1: Regex,
}

impl TrafficParser {
    /// Compile the socket-row pattern.
    ///
    /// # Errors
    ///
    /// Fails only if the pattern does not compile.
    pub fn new() -> Result<Self> {
        Ok(Self {
            socket1: Regex::new(r"(?m)^1\s+(\d+)\s+(\d+)\s+([\d.]+)\s+([\d.]+)")?,
        })
    }

    /// Text of `section`: from its banner to the next banner, or
    /// [`SECTION_FALLBACK_BYTES`] past the start.
    #[must_use]
    pub fn section<'a>(&self, text: &'a str, section: TrafficSection) -> Option<&'a str> {
        let start = text.find(section.banner())?;
        let end = text[start..]
            .find(section.next_banner())
            .map_or_else(|| floor_char_boundary(text, start + SECTION_FALLBACK_BYTES), |off| start + off);
        Some(&text[start..end])
    }

    /// Socket-1 traffic in `section`; `None` if the banner or row is absent.
    #[must_use]
    pub fn socket1(&self, text: &str, section: TrafficSection) -> Option<SocketTraffic> {
        let body = self.section(text, section)?;
        let caps = self.socket1.captures(body)?;
        Some(SocketTraffic {
            read: caps[1].parse().ok()?,
            write: caps[2].parse().ok()?,
            read_bw: caps[3].parse().ok()?,
            write_bw: caps[4].parse().ok()?,
        })
    }
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "\
Intel PCM Memory Performance Statistics
Skt  Read        Write        Read MB/s  Write MB/s
0    1000        2000         1.0        2.0
1    849920      1364032      81.1       130.1      0.2      0        80.0
Intel PCM I/O Performance Statistics
Skt  PCIe Rd     PCIe Wr      Rd MB/s    Wr MB/s
0    5           6            0.1        0.2
1    288364      398784       27.5       38.0       0.0       0.09     0.12
Intel PCM System-Wide Statistics
1    7           7            7.0        7.0
";

    #[test]
    fn test_memory_socket1() {
        let parser = TrafficParser::new().unwrap();
        let mem = parser.socket1(REPORT, TrafficSection::Memory).unwrap();
        assert_eq!(mem.read, 849_920);
        assert_eq!(mem.write, 1_364_032);
        assert!((mem.read_bw - 81.1).abs() < 1e-9);
        assert!((mem.write_bw - 130.1).abs() < 1e-9);
    }

    #[test]
    fn test_io_section_stops_at_system_banner() {
        let parser = TrafficParser::new().unwrap();
        let io = parser.socket1(REPORT, TrafficSection::Io).unwrap();
        assert_eq!(io.read, 288_364);
        assert!((io.write_bw - 38.0).abs() < 1e-9);
    }

    #[test]
    fn test_fallback_window_without_next_banner() {
        let parser = TrafficParser::new().unwrap();
        let mut text = String::from("Intel PCM I/O Performance Statistics\n");
        text.push_str(&" ".repeat(SECTION_FALLBACK_BYTES));
        text.push_str("\n1    1    2    3.0    4.0\n");
        assert!(parser.socket1(&text, TrafficSection::Io).is_none());

        let near = "Intel PCM I/O Performance Statistics\n1    1    2    3.0    4.0\n";
        assert_eq!(parser.socket1(near, TrafficSection::Io).unwrap().write, 2);
    }

    #[test]
    fn test_missing_banner() {
        let parser = TrafficParser::new().unwrap();
        assert!(parser.socket1("no pcm here", TrafficSection::Memory).is_none());
    }
}
