//! ASCII art banner for interactive mode.

use std::io::IsTerminal;

/// ANSI true-color escape sequences for the banner palette.
struct Colors {
    dish_dark: &'static str,
    dish_light: &'static str,
    star: &'static str,
    title: &'static str,
    subtitle: &'static str,
    reset: &'static str,
}

const COLOR: Colors = Colors {
    dish_dark: "\x1b[38;2;70;85;120m",
    dish_light: "\x1b[38;2;120;140;185m",
    star: "\x1b[38;2;255;240;200m",
    title: "\x1b[1;38;2;140;170;230m",
    subtitle: "\x1b[38;2;100;100;120m",
    reset: "\x1b[0m",
};

const PLAIN: Colors = Colors {
    dish_dark: "",
    dish_light: "",
    star: "",
    title: "",
    subtitle: "",
    reset: "",
};

/// Prints the voidwatch banner to stdout.
///
/// Renders ANSI true-color when stdout is a terminal,
/// falls back to plain text otherwise.
pub fn print_banner() {
    let c = if std::io::stdout().is_terminal() {
        &COLOR
    } else {
        &PLAIN
    };

    let dd = c.dish_dark;
    let dl = c.dish_light;
    let st = c.star;
    let tt = c.title;
    let sb = c.subtitle;
    let r = c.reset;

    println!(
        r#"
{st}      ✦{r}         {st}·{r}
{dl}   ▄▄█████▄▄{r}          {tt}▌ ▌▞▀▖▜▘▛▀▖▌  ▌▞▀▖▀▛▘▞▀▖▌ ▌{r}
{dl}  ██▘     ▝██{r}         {tt}▚▗▘▌ ▌▐ ▌ ▌▌▖▌▌▙▄▌ ▌ ▌  ▙▄▌{r}
{dl} ██    {st}●{dl}    ██{r}        {tt}▝▞ ▝▀ ▀▘▀▀ ▘▝ ▘▘ ▘ ▘ ▝▀ ▘ ▘{r}
{dl}  ██▖     ▗██{r}
{dd}   ▀▀█▄▄▄█▀▀{r}          {sb}"The void doesn't blink."{r}
{dd}      ███{r}
{dd}     ▄███▄{r}
"#
    );
}
