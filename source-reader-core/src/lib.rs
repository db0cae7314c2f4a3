#![doc = "source-reader-core: core logic library for source-reader."]

//! This crate holds everything that turns a repository into chapters and hands
//! them to a renderer: configuration types, encoding detection, file
//! selection, chapter extraction, the git and pandoc collaborators, and the
//! orchestrating [`pipeline::Pipeline`].
//!
//! # Usage
//! Build a [`config::ReaderConfig`], pick a [`contract::Downloader`] and a
//! [`contract::Renderer`] (the real ones are [`download::GitDownloader`] and
//! [`render::PandocRenderer`]), then call [`pipeline::Pipeline::run`].

pub mod config;
pub mod contract;
pub mod download;
pub mod encoding;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod render;
pub mod select;
