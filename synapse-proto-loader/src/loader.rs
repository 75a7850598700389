//! Package loading entry points
//!
//! Every entry point ends in the same place: a resolved [`SchemaTree`]
//! handed to [`build_package_definition`]. They differ only in where the
//! schema comes from: `.proto` sources, binary descriptor-set bytes, a
//! JSON descriptor-set object, or an existing descriptor pool.

use crate::builder::build_package_definition;
use crate::definition::PackageDefinition;
use crate::descriptor;
use crate::error::Result;
use crate::options::Options;
use crate::schema::SchemaTree;
use prost_reflect::DescriptorPool;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Parse `.proto` files and build their package definition
///
/// Imports are searched in `options.include_dirs`; when none are given, the
/// directory of each input file is used.
pub fn load_sync<P: AsRef<Path>>(files: &[P], options: &Options) -> Result<PackageDefinition> {
    let pool = parse_proto_files(files, &options.include_dirs)?;
    from_descriptor_pool(pool, options)
}

/// Async variant of [`load_sync`]
///
/// Parsing runs on the runtime's blocking pool; the build itself is the
/// same synchronous pass.
pub async fn load<I, P>(files: I, options: Options) -> Result<PackageDefinition>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let files: Vec<PathBuf> = files.into_iter().map(|f| f.as_ref().to_path_buf()).collect();
    tokio::task::spawn_blocking(move || load_sync(&files, &options)).await?
}

/// Build a package definition from binary `FileDescriptorSet` bytes
pub fn load_file_descriptor_set_from_buffer(
    bytes: &[u8],
    options: &Options,
) -> Result<PackageDefinition> {
    from_descriptor_pool(descriptor::pool_from_descriptor_set_bytes(bytes)?, options)
}

/// Build a package definition from a `FileDescriptorSet` JSON object
pub fn load_file_descriptor_set_from_json(
    value: &serde_json::Value,
    options: &Options,
) -> Result<PackageDefinition> {
    from_descriptor_pool(descriptor::pool_from_descriptor_set_json(value)?, options)
}

/// Build a package definition from an already resolved pool
pub fn from_descriptor_pool(pool: DescriptorPool, options: &Options) -> Result<PackageDefinition> {
    let tree = SchemaTree::new(pool)?;
    build_package_definition(&tree, options)
}

fn parse_proto_files<P: AsRef<Path>>(files: &[P], include_dirs: &[PathBuf]) -> Result<DescriptorPool> {
    let mut includes: Vec<PathBuf> = include_dirs.to_vec();
    if includes.is_empty() {
        for file in files {
            let dir = match file.as_ref().parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            if !includes.contains(&dir) {
                includes.push(dir);
            }
        }
    }

    debug!(files = files.len(), includes = ?includes, "parsing proto files");

    let mut compiler = protox::Compiler::new(&includes)?;
    compiler.include_imports(true);
    compiler.open_files(files)?;
    Ok(compiler.descriptor_pool())
}
