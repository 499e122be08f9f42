mod cascade;
mod common;
