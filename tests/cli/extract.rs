use anyhow::{Ok, Result};
use predicates::prelude::*;

use crate::CliTest;

#[test]
fn test_singular_extraction() -> Result<()> {
    let test = CliTest::with_file(
        "src/app.c",
        "\
#include <libintl.h>

int main(void) {
    puts(gettext(\"hello\"));
    return 0;
}
",
    )?;

    test.extract_command()
        .arg("src/app.c")
        .assert()
        .success()
        .stdout(predicate::str::contains("#: src/app.c:4\nmsgid \"hello\"\nmsgstr \"\"\n"));

    Ok(())
}

#[test]
fn test_plural_with_context() -> Result<()> {
    let test = CliTest::with_file(
        "menu.c",
        "const char *s = npgettext(\"menu\", \"item\", \"items\", n);\n",
    )?;

    test.extract_command()
        .arg("menu.c")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "msgctxt \"menu\"\nmsgid \"item\"\nmsgid_plural \"items\"\nmsgstr[0] \"\"\nmsgstr[1] \"\"\n",
        ));

    Ok(())
}

#[test]
fn test_escape_decoding() -> Result<()> {
    let test = CliTest::with_file("esc.c", "gettext(\"caf\\xc3\\xa9\");\n")?;

    test.extract_command()
        .arg("esc.c")
        .assert()
        .success()
        .stdout(predicate::str::contains("msgid \"café\""));

    Ok(())
}

#[test]
fn test_deduplication_across_files() -> Result<()> {
    let test = CliTest::with_file("d.c", "gettext(\"ok\");\n")?;
    test.write_file("e.c", "int x;\nint y;\nint z;\nint w;\nint v;\nint u;\ngettext(\"ok\");\n")?;

    test.extract_command()
        .arg("d.c")
        .arg("e.c")
        .assert()
        .success()
        .stdout(predicate::str::contains("#: d.c:1 e.c:7\nmsgid \"ok\"\n"));

    Ok(())
}

#[test]
fn test_adjacent_concatenation() -> Result<()> {
    let test = CliTest::with_file("f.c", "\ngettext(\"hello, \" \"world\");\n")?;

    test.extract_command()
        .arg("f.c")
        .assert()
        .success()
        .stdout(predicate::str::contains("#: f.c:2\nmsgid \"hello, world\"\n"));

    Ok(())
}

#[test]
fn test_format_classification() -> Result<()> {
    let test = CliTest::with_file("fmt.c", "printf(\"%d items\", n);\n")?;

    test.extract_command()
        .arg("--extract-all")
        .arg("fmt.c")
        .assert()
        .success()
        .stdout(predicate::str::contains("#, c-format\nmsgid \"%d items\"\n"));

    Ok(())
}

#[test]
fn test_literal_percent_not_a_format_string() -> Result<()> {
    let test = CliTest::with_file("fmt.c", "printf(\"100%% complete\");\n")?;

    test.extract_command()
        .arg("--extract-all")
        .arg("fmt.c")
        .assert()
        .success()
        .stdout(predicate::str::contains("#, no-c-format\nmsgid \"100%% complete\"\n"));

    Ok(())
}

#[test]
fn test_extracted_comments() -> Result<()> {
    let test = CliTest::with_file(
        "c.c",
        "\
/* TRANSLATORS: keep this short */
gettext(\"Save\");
",
    )?;

    test.extract_command()
        .arg("--add-comments=TRANSLATORS:")
        .arg("c.c")
        .assert()
        .success()
        .stdout(predicate::str::contains("#. TRANSLATORS: keep this short\n#: c.c:2\n"));

    Ok(())
}

#[test]
fn test_python_file() -> Result<()> {
    let test = CliTest::with_file(
        "app.py",
        "\
import gettext

def greet(n):
    print(_(\"hi there\"))
    return ngettext(\"%d file\", \"%d files\", n)
",
    )?;

    test.extract_command()
        .arg("app.py")
        .assert()
        .success()
        .stdout(predicate::str::contains("msgid \"hi there\""))
        .stdout(predicate::str::contains("msgid \"%d file\"\nmsgid_plural \"%d files\"\n"));

    Ok(())
}

#[test]
fn test_perl_file() -> Result<()> {
    let test = CliTest::with_file(
        "script.pl",
        "\
use Locale::Messages qw(gettext);

print gettext \"paren-less\";
print gettext(<<EOT);
multi
line
EOT
",
    )?;

    test.extract_command()
        .arg("script.pl")
        .assert()
        .success()
        .stdout(predicate::str::contains("msgid \"paren-less\""))
        .stdout(predicate::str::contains("\"multi\\n\"\n\"line\\n\"\n"));

    Ok(())
}

#[test]
fn test_empty_msgid_warns_and_is_skipped() -> Result<()> {
    let test = CliTest::with_file("w.c", "gettext(\"\");\n")?;

    test.extract_command()
        .arg("w.c")
        .assert()
        .success()
        .stderr(predicate::str::contains("w.c:1: warning: empty msgid"))
        .stdout(predicate::str::contains("msgid").not());

    Ok(())
}

#[test]
fn test_conflicting_plurals_fail_the_run() -> Result<()> {
    let test = CliTest::with_file(
        "p.c",
        "ngettext(\"item\", \"items\", n);\nngettext(\"item\", \"itemses\", n);\n",
    )?;

    test.extract_command()
        .arg("p.c")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error"))
        .stderr(predicate::str::contains("two different plural forms"));

    Ok(())
}

#[test]
fn test_directory_walk_with_ignore() -> Result<()> {
    let test = CliTest::with_file("src/a.c", "gettext(\"from a\");\n")?;
    test.write_file("src/vendor/b.c", "gettext(\"from vendor\");\n")?;
    test.write_file("src/notes.txt", "gettext(\"not source\");\n")?;

    test.extract_command()
        .arg("--ignore=**/vendor/**")
        .arg("src")
        .assert()
        .success()
        .stdout(predicate::str::contains("from a"))
        .stdout(predicate::str::contains("from vendor").not())
        .stdout(predicate::str::contains("not source").not());

    Ok(())
}

#[test]
fn test_output_file() -> Result<()> {
    let test = CliTest::with_file("o.c", "gettext(\"to file\");\n")?;

    test.extract_command()
        .arg("-o")
        .arg("out.pot")
        .arg("o.c")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let written = test.read_file("out.pot")?;
    assert!(written.contains("msgid \"to file\""));

    Ok(())
}

#[test]
fn test_exclusion_file() -> Result<()> {
    let test = CliTest::with_file("x.c", "gettext(\"keep\");\ngettext(\"drop\");\n")?;
    test.write_file("exclude.po", "msgid \"drop\"\nmsgstr \"dropped\"\n")?;

    test.extract_command()
        .arg("--exclude-file=exclude.po")
        .arg("x.c")
        .assert()
        .success()
        .stdout(predicate::str::contains("keep"))
        .stdout(predicate::str::contains("drop").not());

    Ok(())
}

#[test]
fn test_help() -> Result<()> {
    let test = CliTest::new()?;

    test.command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--keyword"))
        .stdout(predicate::str::contains("--extract-all"));

    Ok(())
}

#[test]
fn test_missing_input_is_a_usage_error() -> Result<()> {
    let test = CliTest::new()?;

    test.command().assert().code(2);

    Ok(())
}
