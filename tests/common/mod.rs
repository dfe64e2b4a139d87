//! Shared fixtures: synthetic tool logs and a recording command runner

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use dpdk_bench::process::{CommandOutcome, CommandRunner, RunMode};
use dpdk_bench::Result;

// ============================================================================
// Log fixtures
// ============================================================================

/// Application summary section with a `Total RX TX` line.
pub fn app_summary(app: &str, rx: u64, tx: u64) -> String {
    format!(
        "EAL: Detected 64 lcore(s)\n\
         Port 0: link up - speed 100000 Mbps\n\
         ======== {app} Packet Statistics Summary ========\n\
         Core     RX           TX           RX Mpps    TX Mpps    TX %\n\
         1        {rx}     {tx}     1.0        1.0        100.0\n\
         Total    {rx}     {tx}                          50.0\n\
         ==================================================\n"
    )
}

/// Embedded PCM report: core table plus memory and I/O sections.
///
/// Core rows are `(core, l3_misses, l2_hit, l3_hit)`.
pub fn pcm_report(cores: &[(u32, u64, f64, f64)], memory: (u64, u64, f64, f64), io: (u64, u64, f64, f64)) -> String {
    let sep = "----  ----------  ------------  ----  ---------  -------  -------  ----  ----  ------\n";
    let mut out = String::from("Intel PCM Core Performance Statistics\n");
    out.push_str("Core  Cycles      Instructions  IPC   L3 Misses  L2 Hit%  L3 Hit%  Freq  CPU%  Energy\n");
    out.push_str(sep);
    for (core, l3_misses, l2_hit, l3_hit) in cores {
        out.push_str(&format!(
            "{core}     123456789   98765432      0.80  {l3_misses}       {l2_hit:.1}     {l3_hit:.1}     2.1   99.0  1.2\n"
        ));
    }
    out.push_str(sep);
    out.push_str("Intel PCM Memory Performance Statistics\n");
    out.push_str("Skt  Read        Write        Read MB/s  Write MB/s\n");
    out.push_str("0    1           2            0.1        0.2\n");
    out.push_str(&format!(
        "1    {}      {}      {:.1}       {:.1}\n",
        memory.0, memory.1, memory.2, memory.3
    ));
    out.push_str("Intel PCM I/O Performance Statistics\n");
    out.push_str("Skt  PCIe Rd     PCIe Wr      Rd MB/s    Wr MB/s\n");
    out.push_str(&format!("1    {}      {}      {:.1}       {:.1}\n", io.0, io.1, io.2, io.3));
    out.push_str("Intel PCM System-Wide Statistics\n");
    out
}

/// One `pcm-pcie -B -e` block for socket 0 and 1.
pub fn pcm_pcie_block(total: &str, miss: &str, rd: &str, wr: &str) -> String {
    format!(
        " Skt | PCIRdCur | RFO | CRd | DRd | ItoM | PRd | WiL | PCIe Rd (B) | PCIe Wr (B)\n\
         ---------------------------------------------------------------------------------\n \
         0 (Total)  {total}  10 K  0  0  0  0  0  {rd}  {wr}\n \
         0 (Miss)   {miss}   1 K   0  0  0  0  0  0     0\n \
         0 (Hit)    1 M      9 K   0  0  0  0  0  0     0\n \
         1 (Total)  99 M     99 K  0  0  0  0  0  99 G  99 G\n"
    )
}

/// `perf stat` interval output with one line per `(timestamp, event, value)`.
pub fn perf_log(samples: &[(u32, &str, u64)]) -> String {
    let mut out = String::from("#           time socket cpus             counts unit events\n");
    for (ts, event, value) in samples {
        out.push_str(&format!("{ts:>5}.001096320 S0       32            {value}      {event}\n"));
    }
    out
}

/// NeoHost counter dump, one block per sample.
pub fn neohost_log(samples: &[(u64, f64, f64)]) -> String {
    let mut out = String::new();
    for (stalled, inbound, outbound) in samples {
        out.push_str(&format!(
            "|| Outbound Stalled Reads        || {stalled}        ||\n\
             ||| PCIe Inbound Used BW         || {inbound} [Gb/s] ||\n\
             ||| PCIe Outbound Used BW        || {outbound} [Gb/s] ||\n"
        ));
    }
    out
}

/// Bench home with the three config files.
pub fn write_home(home: &Path, cluster: &str, system: &str, test: &str) {
    fs::create_dir_all(home.join("config")).unwrap();
    fs::write(home.join("cluster.config"), cluster).unwrap();
    fs::write(home.join("config/system.config"), system).unwrap();
    fs::write(home.join("config/test.config"), test).unwrap();
}

pub const SYSTEM_CONFIG: &str = "\
# NICs
PKTGEN_NIC_MAC=aa:bb:cc:dd:ee:ff
PKTGEN_NIC_PCI=0000:51:00.0
L3FWD_NIC_PCI=0000:17:00.0
";

// ============================================================================
// Recording runner
// ============================================================================

/// A call the controller made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Local(String),
    Remote {
        host: String,
        command: String,
        mode: RunMode,
    },
    Capture(String),
    Sleep(u64),
}

type Hook = Box<dyn FnMut(&str)>;

/// Records every call instead of running it.
#[derive(Default)]
pub struct RecordingRunner {
    pub calls: Vec<Call>,
    /// `(substring, exit code)`: first match decides a local command's code
    pub exit_codes: Vec<(String, i32)>,
    /// Returned by `capture`
    pub capture_output: String,
    /// Called with every local command, e.g. to drop fixture logs
    pub on_local: Option<Hook>,
    /// `calls.len()` at each `join_background`
    pub joined_at: Vec<usize>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hook(hook: impl FnMut(&str) + 'static) -> Self {
        Self {
            on_local: Some(Box::new(hook)),
            ..Self::default()
        }
    }

    pub fn locals(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Local(cmd) => Some(cmd.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn sleeps(&self) -> Vec<u64> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Sleep(s) => Some(*s),
                _ => None,
            })
            .collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn run_local(&mut self, command: &str) -> Result<CommandOutcome> {
        self.calls.push(Call::Local(command.to_string()));
        if let Some(hook) = self.on_local.as_mut() {
            hook(command);
        }
        let code = self
            .exit_codes
            .iter()
            .find(|(needle, _)| command.contains(needle.as_str()))
            .map_or(0, |(_, code)| *code);
        Ok(CommandOutcome::exited(code))
    }

    fn run_remote(&mut self, host: &str, command: &str, mode: RunMode) -> Result<CommandOutcome> {
        self.calls.push(Call::Remote {
            host: host.to_string(),
            command: command.to_string(),
            mode,
        });
        Ok(match mode {
            RunMode::Foreground => CommandOutcome::exited(0),
            RunMode::Background => CommandOutcome::detached(),
        })
    }

    fn capture(&mut self, command: &str) -> Result<String> {
        self.calls.push(Call::Capture(command.to_string()));
        Ok(self.capture_output.clone())
    }

    fn sleep(&mut self, seconds: u64) {
        self.calls.push(Call::Sleep(seconds));
    }

    fn join_background(&mut self) {
        self.joined_at.push(self.calls.len());
    }
}
