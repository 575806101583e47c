//! Parsing of `ifconfig` interface descriptions

use crate::models::InterfaceStatus;

const FLAGS_MARKER: &str = "flags=";
const UP_FLAG: &str = "UP";

/// Determine whether an interface description reports the `UP` flag.
///
/// Every line carrying a `flags=` marker is inspected; the flag list is the
/// text between the first `<` and the first `>` on that line. The input is not
/// filtered by interface name, so callers pass the output for one interface.
/// Never returns [`InterfaceStatus::Unknown`].
pub fn parse_interface_status(output: &str) -> InterfaceStatus {
    for line in output.lines() {
        if !line.contains(FLAGS_MARKER) {
            continue;
        }

        let (start, end) = match (line.find('<'), line.find('>')) {
            (Some(start), Some(end)) if start < end => (start, end),
            _ => continue,
        };

        let flags = &line[start + 1..end];
        if flags.split(',').any(|flag| flag.trim() == UP_FLAG) {
            return InterfaceStatus::Up;
        }
    }

    InterfaceStatus::Down
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_up() {
        let output = "awdl0: flags=8051<UP,POINTOPOINT,RUNNING,MULTICAST> mtu 1500\n\tether 00:11:22:33:44:55";
        assert_eq!(parse_interface_status(output), InterfaceStatus::Up);
    }

    #[test]
    fn test_interface_down() {
        let output = "awdl0: flags=8050<POINTOPOINT,RUNNING,MULTICAST> mtu 1500\n\tether 00:11:22:33:44:55";
        assert_eq!(parse_interface_status(output), InterfaceStatus::Down);
    }

    #[test]
    fn test_empty_output() {
        assert_eq!(parse_interface_status(""), InterfaceStatus::Down);
    }

    #[test]
    fn test_no_flags_line() {
        let output = "ifconfig: interface awdl0 does not exist\n\tsome <UP> text";
        assert_eq!(parse_interface_status(output), InterfaceStatus::Down);
    }

    #[test]
    fn test_up_in_any_position() {
        for flags in [
            "<UP>",
            "<RUNNING,UP>",
            "<BROADCAST,UP,MULTICAST>",
            "<MULTICAST,RUNNING,BROADCAST,UP>",
        ] {
            let output = format!("en0: flags=8863{} mtu 1500", flags);
            assert_eq!(
                parse_interface_status(&output),
                InterfaceStatus::Up,
                "flags {}",
                flags
            );
        }
    }

    #[test]
    fn test_malformed_brackets() {
        assert_eq!(
            parse_interface_status("awdl0: flags=8051>UP,RUNNING< mtu 1500"),
            InterfaceStatus::Down
        );
        assert_eq!(
            parse_interface_status("awdl0: flags=8051<UP,RUNNING mtu 1500"),
            InterfaceStatus::Down
        );
        assert_eq!(
            parse_interface_status("awdl0: flags=8051 UP,RUNNING> mtu 1500"),
            InterfaceStatus::Down
        );
    }

    #[test]
    fn test_multiple_interfaces_matches_any_up() {
        let output = "lo0: flags=8049<UP,LOOPBACK,RUNNING,MULTICAST> mtu 16384\n\
                      awdl0: flags=8050<POINTOPOINT,RUNNING,MULTICAST> mtu 1500";
        // No name filtering: the loopback line wins
        assert_eq!(parse_interface_status(output), InterfaceStatus::Up);
    }

    #[test]
    fn test_malformed_line_then_valid_line() {
        let output = "awdl0: flags=8051 broken\n\tnd6 options=201<UP,PERFORMNUD,DAD>\n\tflags=1<UP>";
        assert_eq!(parse_interface_status(output), InterfaceStatus::Up);
    }
}
