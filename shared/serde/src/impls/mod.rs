mod collections;
mod primitives;
mod string;
