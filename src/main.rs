fn main() -> anyhow::Result<()> {
    scene_walker::run_viewer(scene_walker::ViewerConfig::default())
}
