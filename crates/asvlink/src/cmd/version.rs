use asvlink_frame::{ModuleId, HEADER_SIZE, MAX_PAYLOAD, SYNC_PATTERN};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    println!("asvlink {}", env!("CARGO_PKG_VERSION"));
    if args.extended {
        for (key, value) in provenance() {
            println!("{key}: {value}");
        }
    }
    Ok(SUCCESS)
}

/// Build and wire facts worth pasting into a bug report when two ends of a
/// line disagree.
fn provenance() -> Vec<(&'static str, String)> {
    let modules = ModuleId::ALL
        .iter()
        .map(|m| format!("{}=0x{:02X}", m.name(), m.as_u8()))
        .collect::<Vec<_>>()
        .join(",");

    vec![
        ("build", build_label()),
        (
            "host",
            format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS),
        ),
        (
            "sync",
            format!("{:02X}{:02X}", SYNC_PATTERN[0], SYNC_PATTERN[1]),
        ),
        ("header", format!("{HEADER_SIZE}B + payload<={MAX_PAYLOAD}B + crc8")),
        ("baud", asvlink_transport::DEFAULT_BAUD_RATE.to_string()),
        ("modules", modules),
    ]
}

fn build_label() -> String {
    format!(
        "{} ({})",
        option_env!("ASVLINK_BUILD_TARGET").unwrap_or("unknown"),
        option_env!("ASVLINK_BUILD_PROFILE").unwrap_or("unknown"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provenance_lists_every_module_address() {
        let facts = provenance();
        let modules = &facts.iter().find(|(key, _)| *key == "modules").unwrap().1;
        assert_eq!(modules.split(',').count(), ModuleId::ALL.len());
        assert!(modules.contains("registrar=0xFF"));
        assert!(modules.contains("depth_meter=0x71"));
    }

    #[test]
    fn provenance_names_the_sync_pattern() {
        let facts = provenance();
        assert!(facts.contains(&("sync", "FAFA".to_string())));
    }
}
