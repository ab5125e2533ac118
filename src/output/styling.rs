use std::fmt::Display;

use console::{style, StyledObject};

macro_rules! styles {
    ($($name:ident => $($modifier:ident).+;)+) => {
        $(
            pub fn $name(text: impl Display) -> StyledObject<String> {
                style(text.to_string())$(.$modifier())+
            }
        )+
    };
}

// Terminal styles shared by the banner, the spinner and the summaries.
styles! {
    bright => bright;
    bright_green => bright.green;
    bright_red => bright.red;
    bright_yellow => bright.yellow;
    blue_bold => blue.bold;
    cyan => cyan;
    dim => dim;
}
