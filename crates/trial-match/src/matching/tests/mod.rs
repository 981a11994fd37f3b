mod common;
mod reasoner;
