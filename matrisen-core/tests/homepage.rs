use matrisen_core::{Config, Feature, SiteBuilder, build_site, default_features};

fn static_dir_with_images() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("img")).unwrap();
    for image in ["3dplot.png", "teapot.png", "cube.png", "docusaurus.png"] {
        std::fs::write(dir.path().join("img").join(image), b"\x89PNG").unwrap();
    }
    std::fs::write(dir.path().join("favicon.ico"), b"ico").unwrap();
    dir
}

#[test]
fn builds_homepage_with_three_feature_cards() {
    let static_dir = static_dir_with_images();
    let out = tempfile::tempdir().unwrap();

    let site = SiteBuilder::new()
        .static_dir(static_dir.path())
        .output_dir(out.path())
        .theme_dir(out.path().join("no-theme"))
        .year(2026)
        .build()
        .unwrap();
    site.render_all().unwrap();

    let html = std::fs::read_to_string(out.path().join("index.html")).unwrap();

    assert!(html.contains("<h1 class=\"hero__title\">Matrisen</h1>"));
    assert!(html.contains("everything is tasty in the matrix"));
    assert_eq!(html.matches("class=\"col col--4\"").count(), 3);
    assert!(html.contains("src=\"/matrisen/img/3dplot.png\""));
    assert!(html.contains("src=\"/matrisen/img/teapot.png\""));
    assert!(html.contains("src=\"/matrisen/img/cube.png\""));
    assert!(html.contains("Copyright © 2026 kniv0gaffel"));
    assert!(html.contains("href=\"https://github.com/kniv0gaffel/matrisen\""));
    assert!(html.contains("katex.min.css"));
    assert!(!html.contains("__livereload"));

    // Static assets are copied next to the page.
    assert!(out.path().join("img/cube.png").is_file());
    assert!(out.path().join("favicon.ico").is_file());
}

#[test]
fn missing_images_are_left_out_of_cards() {
    let static_dir = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let site = SiteBuilder::new()
        .static_dir(static_dir.path())
        .output_dir(out.path())
        .build()
        .unwrap();

    assert!(site.features().iter().all(|f| f.image().is_none()));

    let html = site.render_home().unwrap();
    assert_eq!(html.matches("class=\"featureSvg\"").count(), 0);
    assert!(html.contains("<h3>Plot</h3>"));
    assert!(html.contains("<h3>Render</h3>"));
    assert!(html.contains("<h3>Export</h3>"));
}

#[test]
fn features_from_config_file_replace_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("matrisen.toml");
    std::fs::write(
        &config_path,
        r#"
[site]
base_url = "/"

[[home.features]]
title = "Solve"
image = "https://example.com/solve.svg"
description = "Linear systems, **fast**."
"#,
    )
    .unwrap();

    let config = Config::read(&config_path).unwrap();
    assert_eq!(config.home.features.len(), 1);

    let out = dir.path().join("out");
    let site = build_site(&config, &dir.path().join("static"), &out, &dir.path().join("theme"), None)
        .unwrap();
    assert_eq!(site.features().len(), 1);

    let html = std::fs::read_to_string(out.join("index.html")).unwrap();
    assert_eq!(html.matches("class=\"col col--4\"").count(), 1);
    assert!(html.contains("<img src=\"https://example.com/solve.svg\""));
    assert!(html.contains("Linear systems, <strong>fast</strong>."));
}

#[test]
fn explicit_features_override_config() {
    let out = tempfile::tempdir().unwrap();
    let mut features = default_features();
    features.reverse();
    features.push(Feature {
        title: "Animate".into(),
        image: None,
        image_type: None,
        description: "soon".into(),
    });

    let site = SiteBuilder::new()
        .features(features)
        .output_dir(out.path())
        .build()
        .unwrap();
    let html = site.render_home().unwrap();

    let order: Vec<usize> = ["Export", "Render", "Plot", "Animate"]
        .iter()
        .map(|title| html.find(&format!("<h3>{}</h3>", title)).unwrap())
        .collect();
    assert!(order.windows(2).all(|w| w[0] < w[1]));
    assert!(html.contains("data-key=\"3\""));
}

#[test]
fn live_reload_script_is_injected_in_dev_mode() {
    let out = tempfile::tempdir().unwrap();
    let site = SiteBuilder::new()
        .output_dir(out.path())
        .live_reload(matrisen_core::LiveReload {
            host: "127.0.0.1".into(),
            port: 3000,
            path: "/__livereload".into(),
        })
        .build()
        .unwrap();

    let html = site.render_home().unwrap();
    assert!(html.contains("ws://127.0.0.1:3000/__livereload"));
    let script = html.find("<script>").unwrap();
    assert!(script < html.find("</body>").unwrap());
}

#[test]
fn live_reload_values_cannot_break_out_of_the_script() {
    let out = tempfile::tempdir().unwrap();
    let site = SiteBuilder::new()
        .output_dir(out.path())
        .live_reload(matrisen_core::LiveReload {
            host: "evil</script><script>alert(1)//".into(),
            port: 3000,
            path: "/'+x+'".into(),
        })
        .build()
        .unwrap();

    let html = site.render_home().unwrap();
    assert_eq!(html.matches("</script>").count(), 1);
    assert!(!html.contains("<script>alert(1)"));
    assert!(html.contains(r#"new WebSocket("ws://evil\u003c/script\u003e\u003cscript\u003ealert(1)//"#));
    assert!(html.contains(r#":3000/'+x+'")"#));
}
