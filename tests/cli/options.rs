use anyhow::{Ok, Result};
use predicates::prelude::*;

use crate::CliTest;

#[test]
fn test_header_fields() -> Result<()> {
    let test = CliTest::with_file("h.c", "gettext(\"x\");\n")?;

    test.command()
        .arg("--package-name=example")
        .arg("--package-version=1.2")
        .arg("--msgid-bugs-address=bugs@example.com")
        .arg("--copyright-holder=Example Inc.")
        .arg("h.c")
        .assert()
        .success()
        .stdout(predicate::str::contains("# Copyright (C) YEAR Example Inc.\n"))
        .stdout(predicate::str::contains("\"Project-Id-Version: example 1.2\\n\"\n"))
        .stdout(predicate::str::contains(
            "\"Report-Msgid-Bugs-To: bugs@example.com\\n\"\n",
        ))
        .stdout(predicate::str::contains("#, fuzzy\nmsgid \"\"\nmsgstr \"\"\n"));

    Ok(())
}

#[test]
fn test_plural_forms_template_only_with_plurals() -> Result<()> {
    let test = CliTest::with_file("p.c", "ngettext(\"one\", \"many\", n);\n")?;

    test.command()
        .arg("p.c")
        .assert()
        .success()
        .stdout(predicate::str::contains("Plural-Forms: nplurals=INTEGER"));

    let test = CliTest::with_file("s.c", "gettext(\"only singular\");\n")?;
    test.command()
        .arg("s.c")
        .assert()
        .success()
        .stdout(predicate::str::contains("Plural-Forms").not());

    Ok(())
}

#[test]
fn test_custom_keyword_with_disabled_defaults() -> Result<()> {
    let test = CliTest::with_file("k.c", "tr(\"mine\");\ngettext(\"default\");\n")?;

    test.extract_command()
        .arg("--keyword=")
        .arg("--keyword=tr:1")
        .arg("k.c")
        .assert()
        .success()
        .stdout(predicate::str::contains("mine"))
        .stdout(predicate::str::contains("default").not());

    Ok(())
}

#[test]
fn test_keyword_with_context_spec() -> Result<()> {
    let test = CliTest::with_file("k.c", "translate(\"ctx\", \"text\");\n")?;

    test.extract_command()
        .arg("--keyword=translate:1c,2")
        .arg("k.c")
        .assert()
        .success()
        .stdout(predicate::str::contains("msgctxt \"ctx\"\nmsgid \"text\"\n"));

    Ok(())
}

#[test]
fn test_msgstr_template() -> Result<()> {
    let test = CliTest::with_file("t.c", "gettext(\"value\");\n")?;

    test.extract_command()
        .arg("--msgstr-prefix=[")
        .arg("--msgstr-suffix=]")
        .arg("t.c")
        .assert()
        .success()
        .stdout(predicate::str::contains("msgid \"value\"\nmsgstr \"[value]\"\n"));

    Ok(())
}

#[test]
fn test_no_location() -> Result<()> {
    let test = CliTest::with_file("n.c", "gettext(\"somewhere\");\n")?;

    test.extract_command()
        .arg("--no-location")
        .arg("n.c")
        .assert()
        .success()
        .stdout(predicate::str::contains("#:").not());

    Ok(())
}

#[test]
fn test_from_code_latin1() -> Result<()> {
    let test = CliTest::new()?;
    let mut bytes = b"gettext(\"caf".to_vec();
    bytes.push(0xE9); // é in ISO-8859-1
    bytes.extend_from_slice(b"\");\n");
    std::fs::write(test.root().join("l.c"), bytes)?;

    test.extract_command()
        .arg("--from-code=ISO-8859-1")
        .arg("l.c")
        .assert()
        .success()
        .stdout(predicate::str::contains("msgid \"café\""));

    Ok(())
}

#[test]
fn test_forced_language() -> Result<()> {
    // A Python-style file under a neutral extension.
    let test = CliTest::with_file("script.inc", "_(\"forced\")\n")?;

    test.extract_command()
        .arg("--language=python")
        .arg("script.inc")
        .assert()
        .success()
        .stdout(predicate::str::contains("forced"));

    Ok(())
}

#[test]
fn test_config_file_keywords() -> Result<()> {
    let test = CliTest::with_file("c.c", "tr(\"from config\");\n")?;
    test.write_file(
        ".potxrc.json",
        r#"{
    "keywords": ["tr:1"]
}"#,
    )?;

    test.extract_command()
        .arg("c.c")
        .assert()
        .success()
        .stdout(predicate::str::contains("from config"));

    Ok(())
}

#[test]
fn test_invalid_config_is_an_error() -> Result<()> {
    let test = CliTest::with_file("c.c", "gettext(\"x\");\n")?;
    test.write_file(".potxrc.json", "{ not json")?;

    test.extract_command().arg("c.c").assert().code(2);

    Ok(())
}
