use super::*;

fn sepia_manifest() -> EffectManifest {
    EffectManifest {
        id: "sepia".into(),
        name: None,
        command: vec!["python3".into(), "effects/sepia.py".into()],
        requirements: vec![
            ParamDecl::new("Strength", ParamValue::Number(0.5)),
            ParamDecl::new("Radius", ParamValue::Number(9.0)),
        ],
        writes_alpha: false,
    }
}

#[test]
fn builtins_share_one_namespace() {
    let reg = Registry::with_builtins();
    assert_eq!(reg.brush_ids().collect::<Vec<_>>(), ["smooth"]);
    assert_eq!(
        reg.effect_ids().collect::<Vec<_>>(),
        ["clear_alpha", "fill", "identity"]
    );
    assert_eq!(reg.effect("fill").unwrap().launcher, EffectLauncher::Builtin);
    assert!(reg.effect("clear_alpha").unwrap().writes_alpha);
    assert!(reg.brush("fill").is_err());
    assert!(reg.effect("smooth").is_err());
}

#[test]
fn requirements_keep_declaration_order() {
    let reg = Registry::with_builtins();
    let names: Vec<_> = reg
        .requirements("fill")
        .unwrap()
        .iter()
        .map(|d| d.name.as_str())
        .collect();
    assert_eq!(names, ["Color", "Strength"]);
    assert!(reg.requirements("identity").unwrap().is_empty());
    assert!(matches!(
        reg.requirements("nope"),
        Err(StrokeFxError::InvalidParameter(_))
    ));
}

#[test]
fn merged_requirements_deduplicate_by_name() {
    let mut reg = Registry::with_builtins();
    reg.register_manifest(sepia_manifest()).unwrap();

    let merged = reg.merged_requirements(&["smooth", "sepia"]).unwrap();
    let names: Vec<_> = merged.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["Radius", "Strength"]);
    // First declaration wins.
    assert_eq!(merged[0].default, ParamValue::Number(5.0));
}

#[test]
fn validate_reports_missing_then_mistyped() {
    let reg = Registry::with_builtins();
    let mut params = ParamMap::new();
    params.insert("Color".into(), ParamValue::Color([0, 0, 0, 255]));

    let err = reg.validate("fill", &params).unwrap_err();
    assert!(matches!(err, StrokeFxError::MissingParameter(ref m) if m.contains("Strength")));

    params.insert("Strength".into(), ParamValue::Bool(true));
    let err = reg.validate("fill", &params).unwrap_err();
    assert!(matches!(err, StrokeFxError::InvalidParameter(_)));

    params.insert("Strength".into(), ParamValue::Number(0.25));
    params.insert("Extra".into(), ParamValue::Number(1.0));
    reg.validate("fill", &params).unwrap();
}

#[test]
fn registration_rejects_duplicates_and_radiusless_brushes() {
    let mut reg = Registry::with_builtins();
    let mut dup = sepia_manifest();
    dup.id = "smooth".into();
    assert!(reg.register_manifest(dup).is_err());

    let err = reg
        .register_brush(BrushDescriptor {
            id: "flat".into(),
            label: "Flat".into(),
            requirements: vec![],
        })
        .unwrap_err();
    assert!(err.to_string().contains(RADIUS));

    let mut blank = sepia_manifest();
    blank.id = "  ".into();
    assert!(reg.register_manifest(blank).is_err());
}

#[test]
fn manifest_without_command_is_rejected() {
    let mut m = sepia_manifest();
    m.command.clear();
    assert!(Registry::new().register_manifest(m).is_err());
}

#[test]
fn loaded_manifest_resolves_relative_program() {
    let dir = std::env::temp_dir().join(format!(
        "strokefx_manifest_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("blur.json");
    std::fs::write(
        &path,
        r#"{
  "id": "blur",
  "name": "Box Blur",
  "command": ["bin/blur", "--fast"],
  "requirements": [
    { "name": "Strength", "kind": "number", "default": { "type": "number", "value": 0.5 } }
  ]
}"#,
    )
    .unwrap();

    let mut reg = Registry::new();
    reg.load_manifest(&path).unwrap();
    let fx = reg.effect("blur").unwrap();
    assert_eq!(fx.name, "Box Blur");
    assert_eq!(
        fx.launcher,
        EffectLauncher::Command {
            program: dir.join("bin/blur"),
            args: vec!["--fast".into()],
        }
    );

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn bare_program_names_are_left_for_path_lookup() {
    let desc = sepia_manifest()
        .into_descriptor(Some(Path::new("/opt/fx")))
        .unwrap();
    let EffectLauncher::Command { program, args } = desc.launcher else {
        panic!("expected a command launcher");
    };
    assert_eq!(program, PathBuf::from("python3"));
    assert_eq!(args, ["effects/sepia.py"]);
    assert_eq!(desc.name, "sepia");
}
