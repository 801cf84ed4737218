pub mod kmer_codec;
pub mod merger;
pub mod reader;
pub mod transpose;
pub mod write;
