//! Small printing macros shared by the CLI commands. Kept minimal: this
//! client is a thin wrapper over the HTTP control interface, not a rich
//! terminal UI.

#[macro_export]
macro_rules! tprint {
    ( $( $arg:tt)* ) => {
        println!($($arg)*);
    };
}

#[macro_export]
macro_rules! teprint {
    ( $x:expr ) => {
        eprintln!("{} {}", console::style("Error:").bold().red(), $x);
    };
}

#[macro_export]
macro_rules! texit {
    ($x:expr) => {{
        $crate::teprint!($x);
        std::process::exit(1);
    }};
}
