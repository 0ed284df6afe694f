use std::io::Write;
use std::path::Path;

use eyre::WrapErr;
use stickerkit_core::{Asset, ClientConfig, StickerPackService};

use crate::Command;

pub async fn run(config: &ClientConfig, command: Command) -> eyre::Result<()> {
    let service = StickerPackService::new(config);

    match command {
        Command::Manifest { pack_id, pack_key } => {
            let manifest = service
                .get_pack_manifest(&pack_id, &pack_key)
                .await
                .wrap_err_with(|| format!("failed to load manifest of pack {pack_id}"))?;
            println!("{}", serde_json::to_string_pretty(&*manifest)?);
        }
        Command::Sticker {
            pack_id,
            pack_key,
            sticker,
            format,
            out,
        } => {
            let asset = service
                .get_asset(&pack_id, &pack_key, sticker, format)
                .await
                .wrap_err_with(|| format!("failed to load sticker {sticker} of pack {pack_id}"))?;
            match out {
                Some(path) => write_file(&path, &asset)?,
                None => write_stdout(&asset)?,
            }
        }
        Command::Emoji {
            pack_id,
            pack_key,
            sticker_id,
        } => {
            let emoji = service
                .get_emoji(&pack_id, &pack_key, sticker_id)
                .await
                .wrap_err("failed to look up emoji")?;
            println!("{emoji}");
        }
    }

    Ok(())
}

fn asset_bytes(asset: &Asset) -> &[u8] {
    match asset {
        Asset::Raw(bytes) => bytes,
        Asset::DataUri(uri) => uri.as_bytes(),
    }
}

fn write_file(path: &Path, asset: &Asset) -> eyre::Result<()> {
    std::fs::write(path, asset_bytes(asset))
        .wrap_err_with(|| format!("failed to write {}", path.display()))?;
    tracing::info!("wrote {}", path.display());
    Ok(())
}

fn write_stdout(asset: &Asset) -> eyre::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(asset_bytes(asset))?;
    if matches!(asset, Asset::DataUri(_)) {
        writeln!(stdout)?;
    }
    stdout.flush()?;
    Ok(())
}
