// src/menu.rs

//! Interactive text menu.

use std::io::{self, BufRead, Write};

use tracing::debug;

use crate::App;
use crate::errors::Result;

/// One line of user input at the main menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Usb,
    Processes,
    Ports,
    Exit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(MenuChoice::Usb),
            "2" => Some(MenuChoice::Processes),
            "3" => Some(MenuChoice::Ports),
            "0" => Some(MenuChoice::Exit),
            _ => None,
        }
    }
}

fn print_menu() {
    println!();
    println!("===== MEDIAGUARD =====");
    println!("1. USB device scanner");
    println!("2. Process monitor");
    println!("3. Port scanner");
    println!("0. Exit");
    print!("Choose an option: ");
    let _ = io::stdout().flush();
}

/// Read one line; `None` on end of input.
fn read_line(input: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// Prompt until a number in `1..=65535` is entered. `None` on end of input.
fn prompt_port(input: &mut impl BufRead, label: &str) -> Result<Option<u32>> {
    loop {
        print!("{label} port (1-65535): ");
        let _ = io::stdout().flush();

        let Some(line) = read_line(input)? else {
            return Ok(None);
        };
        match line.trim().parse::<u32>() {
            Ok(port) if (1..=65535).contains(&port) => return Ok(Some(port)),
            _ => println!("Invalid port: {}", line.trim()),
        }
    }
}

/// Show the menu until the user picks `0` or input ends.
///
/// Errors from a feature are printed and the menu is shown again; only
/// reading the menu input itself can fail this call.
pub fn run_menu(app: &App) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();

    loop {
        print_menu();
        let Some(line) = read_line(&mut input)? else {
            println!();
            return Ok(());
        };

        let Some(choice) = MenuChoice::parse(&line) else {
            println!("Invalid option, try again.");
            continue;
        };
        debug!(?choice, "menu choice");

        let outcome = match choice {
            MenuChoice::Exit => {
                println!("Exiting...");
                return Ok(());
            }
            MenuChoice::Usb => app.usb(),
            MenuChoice::Processes => app.processes(),
            MenuChoice::Ports => {
                let Some(start) = prompt_port(&mut input, "Start")? else {
                    return Ok(());
                };
                let Some(end) = prompt_port(&mut input, "End")? else {
                    return Ok(());
                };
                app.ports(start, end).map(|_| ())
            }
        };

        if let Err(err) = outcome {
            println!("Error: {err}");
        }

        print!("\nPress Enter to return to the menu...");
        let _ = io::stdout().flush();
        if read_line(&mut input)?.is_none() {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn parses_menu_choices() {
        assert_eq!(MenuChoice::parse("1\n"), Some(MenuChoice::Usb));
        assert_eq!(MenuChoice::parse(" 2 "), Some(MenuChoice::Processes));
        assert_eq!(MenuChoice::parse("3"), Some(MenuChoice::Ports));
        assert_eq!(MenuChoice::parse("0"), Some(MenuChoice::Exit));
        assert_eq!(MenuChoice::parse("4"), None);
        assert_eq!(MenuChoice::parse(""), None);
    }

    #[test]
    fn port_prompt_retries_until_valid() {
        let mut input = Cursor::new("abc\n0\n70000\n443\n");
        assert_eq!(prompt_port(&mut input, "Start").unwrap(), Some(443));
    }

    #[test]
    fn port_prompt_stops_at_end_of_input() {
        let mut input = Cursor::new("nope\n");
        assert_eq!(prompt_port(&mut input, "End").unwrap(), None);
    }
}
