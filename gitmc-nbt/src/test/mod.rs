mod builder;
mod de;
mod ser;

pub use builder::Builder;
