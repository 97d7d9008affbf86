//! Static console screens
//!
//! Each screen prints a fixed text block and waits for one option number.
//! The answer is read and discarded; no screen navigates anywhere.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};

const WELCOME: &str = concat!(
    "\nMyNet\n\n",
    "Welcome to the MyNet home network protection program!\n\n",
    "*Be advised pressing the Ctrl key and 'C' will immediately end this program from any screen.\n\n",
    " Enter an option number to continue.\n\n",
    "  1) Current Activity\n\n",
    "  2) Log Report\n\n",
    "  0) Information/ Help\n",
);

const INFO_HELP: &str = concat!(
    "\nMyNet\n\n",
    "Information and Resources\n\n",
    "Hello, this program is a home network protection tool.\n\n",
    "With this version, you can see devices currently on your network.\n",
    "This program will also log network events. These network events\n",
    "include when a device connects to your network. If an event like \n",
    "this occurs, and if the device is registered, then the program\n",
    "shows the registered device name. If the device is not registered,\n",
    "detailed data about the unknown device is stored to the log. Users\n",
    "can then use the data presented and stored by this program to gain\n",
    "more confidence in their network's security or find out if additional\n",
    "measures may need to be implemented.\n\n",
    "For further questions or concerns, please contact the developer,\n",
    "Jose Bianchi at bianchjo@oregonstate.edu.\n\n",
    " Enter an option number to continue.\n\n",
    "  1) Current Activity\n\n",
    "  2) Log Report\n\n",
);

const LOG_REPORT: &str = concat!(
    "\nMyNet\n\n",
    "Log Report\n\n",
    "Recent Activity:\n\n\n\n\n\n\n",
    " Enter an option number to continue.\n\n",
    "  1) Current Activity\n\n",
    "  0) Information/ Help\n",
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Welcome,
    InfoHelp,
    LogReport,
}

impl Screen {
    pub const ALL: [Screen; 3] = [Screen::Welcome, Screen::InfoHelp, Screen::LogReport];

    /// Exact block printed by the screen
    pub fn text(self) -> &'static str {
        match self {
            Screen::Welcome => WELCOME,
            Screen::InfoHelp => INFO_HELP,
            Screen::LogReport => LOG_REPORT,
        }
    }

    /// Print the screen, then read and discard one option number.
    ///
    /// Empty, non-numeric or unreadable input is accepted. Only a failure to
    /// write the screen is an error.
    pub fn run<R: BufRead, W: Write>(self, input: &mut R, output: &mut W) -> Result<()> {
        output
            .write_all(self.text().as_bytes())
            .and_then(|_| output.flush())
            .context("Failed to write screen")?;

        let mut line = Vec::new();
        if let Err(e) = input.read_until(b'\n', &mut line) {
            crate::log_debug!("Screen input not readable: {}", e);
        }
        let choice = String::from_utf8_lossy(&line).trim().parse::<i32>().ok();
        crate::log_debug!("{:?} screen read option {:?}", self, choice);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run_with(screen: Screen, input: &[u8]) -> (Result<()>, String) {
        let mut output = Vec::new();
        let result = screen.run(&mut Cursor::new(input.to_vec()), &mut output);
        (result, String::from_utf8(output).unwrap())
    }

    #[test]
    fn welcome_output_ignores_input() {
        let (numeric, a) = run_with(Screen::Welcome, b"1\n");
        let (garbage, b) = run_with(Screen::Welcome, b"abc\n");

        assert!(numeric.is_ok());
        assert!(garbage.is_ok());
        assert_eq!(a, b);
        assert_eq!(a, Screen::Welcome.text());
    }

    #[test]
    fn every_screen_accepts_any_input() {
        let inputs: [&[u8]; 5] = [b"", b"\n", b"0\n", b"99999999999999999999\n", &[0xff, 0xfe, b'\n']];
        for screen in Screen::ALL {
            for input in inputs {
                let (result, output) = run_with(screen, input);
                assert!(result.is_ok(), "{:?} failed on {:?}", screen, input);
                assert_eq!(output, screen.text());
            }
        }
    }

    #[test]
    fn only_one_line_is_consumed() {
        let mut input = Cursor::new(b"2\nleft over\n".to_vec());
        Screen::LogReport.run(&mut input, &mut Vec::new()).unwrap();

        let mut rest = String::new();
        input.read_line(&mut rest).unwrap();
        assert_eq!(rest, "left over\n");
    }

    #[test]
    fn screens_list_their_options() {
        assert!(Screen::Welcome.text().contains("  1) Current Activity\n"));
        assert!(Screen::Welcome.text().contains("  0) Information/ Help\n"));
        assert!(Screen::Welcome.text().starts_with("\nMyNet\n\nWelcome"));
        assert!(Screen::InfoHelp.text().ends_with("  2) Log Report\n\n"));
        assert!(Screen::InfoHelp.text().contains("If an event like \nthis occurs"));
        assert!(!Screen::InfoHelp.text().contains("Information/ Help"));
        assert!(Screen::LogReport.text().contains("Recent Activity:\n\n\n\n\n\n\n Enter"));
        assert!(!Screen::LogReport.text().contains("2) Log Report"));
    }
}
