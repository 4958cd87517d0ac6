mod common;
mod unit;
