use chrono::{Local, TimeZone};
use doc_courier_core::archive::{archive_tenant, scan_tenant, ArchiveError};
use doc_courier_core::config::TenantEntry;
use doc_courier_core::month::TargetMonth;
use std::fs::{self, create_dir_all, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::tempdir;

fn local(year: i32, month: u32, day: u32) -> SystemTime {
    Local
        .with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .expect("unambiguous local time")
        .into()
}

fn write_file_at(dir: &Path, name: &str, content: &str, modified: SystemTime) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    let file = File::options().write(true).open(&path).unwrap();
    file.set_modified(modified).unwrap();
    path
}

fn tenant_dirs(root: &Path) -> TenantEntry {
    let xml_dir = root.join("xml");
    let pdf_dir = root.join("pdf");
    create_dir_all(&xml_dir).unwrap();
    create_dir_all(&pdf_dir).unwrap();
    TenantEntry { xml_dir, pdf_dir }
}

fn entry_names(bundle: &Path) -> Vec<String> {
    let archive = zip::ZipArchive::new(File::open(bundle).unwrap()).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

fn march_2024() -> TargetMonth {
    TargetMonth::new(3, 2024).unwrap()
}

#[test]
fn test_archive_includes_only_matching_month_and_kind() {
    let tmp = tempdir().unwrap();
    let tenant = tenant_dirs(tmp.path());
    let out = tmp.path().join("out");

    write_file_at(&tenant.xml_dir, "nfe_001.xml", "<nfe>1</nfe>", local(2024, 3, 5));
    write_file_at(&tenant.xml_dir, "nfe_feb.xml", "<nfe>feb</nfe>", local(2024, 2, 27));
    write_file_at(&tenant.xml_dir, "notes.txt", "ignore me", local(2024, 3, 5));
    write_file_at(&tenant.xml_dir, "stray.pdf", "wrong folder", local(2024, 3, 5));
    write_file_at(&tenant.pdf_dir, "danfe_001.pdf", "%PDF-1", local(2024, 3, 20));
    write_file_at(&tenant.pdf_dir, "danfe_apr.pdf", "%PDF-apr", local(2024, 4, 1));
    write_file_at(&tenant.pdf_dir, "danfe_2023.pdf", "%PDF-old", local(2023, 3, 20));
    write_file_at(&tenant.pdf_dir, "stray.xml", "<wrong/>", local(2024, 3, 20));

    let bundle = archive_tenant(2, &tenant, march_2024(), &out)
        .expect("archive should succeed")
        .expect("tenant has matching files");

    assert_eq!(bundle.tenant_index, 2);
    assert_eq!(bundle.path, out.join("tenant_2.zip"));
    assert_eq!(bundle.xml_files, vec!["nfe_001.xml".to_string()]);
    assert_eq!(bundle.pdf_files, vec!["danfe_001.pdf".to_string()]);
    assert_eq!(
        entry_names(&bundle.path),
        vec!["pdf_2/danfe_001.pdf".to_string(), "xml_2/nfe_001.xml".to_string()]
    );
}

#[test]
fn test_archive_preserves_file_content() {
    let tmp = tempdir().unwrap();
    let tenant = tenant_dirs(tmp.path());
    write_file_at(&tenant.xml_dir, "nfe.xml", "<nfe>content</nfe>", local(2024, 3, 10));

    let bundle = archive_tenant(1, &tenant, march_2024(), tmp.path())
        .unwrap()
        .unwrap();

    let mut archive = zip::ZipArchive::new(File::open(&bundle.path).unwrap()).unwrap();
    let mut entry = archive.by_name("xml_1/nfe.xml").expect("entry present");
    let mut content = String::new();
    entry.read_to_string(&mut content).unwrap();
    assert_eq!(content, "<nfe>content</nfe>");
}

#[test]
fn test_archive_without_matches_creates_no_bundle() {
    let tmp = tempdir().unwrap();
    let tenant = tenant_dirs(tmp.path());
    let out = tmp.path().join("out");
    create_dir_all(&out).unwrap();

    write_file_at(&tenant.xml_dir, "old.xml", "<old/>", local(2024, 1, 10));
    write_file_at(&tenant.pdf_dir, "old.pdf", "%PDF", local(2023, 12, 31));

    let result = archive_tenant(1, &tenant, march_2024(), &out).expect("no error");
    assert!(result.is_none());
    assert_eq!(fs::read_dir(&out).unwrap().count(), 0, "output dir stays empty");
}

#[test]
fn test_archive_missing_directory_is_directory_access_error() {
    let tmp = tempdir().unwrap();
    let tenant = TenantEntry {
        xml_dir: tmp.path().join("does-not-exist"),
        pdf_dir: tmp.path().to_path_buf(),
    };

    let err = archive_tenant(1, &tenant, march_2024(), tmp.path()).unwrap_err();
    match err {
        ArchiveError::DirectoryAccess { path, .. } => {
            assert_eq!(path, tmp.path().join("does-not-exist"))
        }
        other => panic!("expected DirectoryAccess, got {other:?}"),
    }
}

#[test]
fn test_archive_does_not_descend_into_subdirectories() {
    let tmp = tempdir().unwrap();
    let tenant = tenant_dirs(tmp.path());

    let nested = tenant.xml_dir.join("2024");
    create_dir_all(&nested).unwrap();
    write_file_at(&nested, "nested.xml", "<nested/>", local(2024, 3, 3));
    create_dir_all(tenant.xml_dir.join("folder.xml")).unwrap();
    write_file_at(&tenant.xml_dir, "top.xml", "<top/>", local(2024, 3, 3));

    let selection = scan_tenant(&tenant, march_2024()).unwrap();
    let names: Vec<&str> = selection.files().map(|f| f.file_name.as_str()).collect();
    assert_eq!(names, vec!["top.xml"]);
}

#[test]
fn test_archive_is_byte_for_byte_repeatable() {
    let tmp = tempdir().unwrap();
    let tenant = tenant_dirs(tmp.path());
    let out = tmp.path().join("out");

    write_file_at(&tenant.xml_dir, "b.xml", "<b/>", local(2024, 3, 2));
    write_file_at(&tenant.xml_dir, "a.xml", "<a/>", local(2024, 3, 1));
    write_file_at(&tenant.pdf_dir, "c.pdf", "%PDF-c", local(2024, 3, 31));

    let first = archive_tenant(1, &tenant, march_2024(), &out).unwrap().unwrap();
    let first_bytes = fs::read(&first.path).unwrap();
    fs::remove_file(&first.path).unwrap();

    let second = archive_tenant(1, &tenant, march_2024(), &out).unwrap().unwrap();
    let second_bytes = fs::read(&second.path).unwrap();

    assert_eq!(first.xml_files, vec!["a.xml".to_string(), "b.xml".to_string()]);
    assert_eq!(first_bytes, second_bytes);
}

#[test]
fn test_archive_replaces_stale_bundle_and_leaves_no_staging_files() {
    let tmp = tempdir().unwrap();
    let tenant = tenant_dirs(tmp.path());
    let out = tmp.path().join("out");
    create_dir_all(&out).unwrap();
    fs::write(out.join("tenant_1.zip"), b"left over from a failed run").unwrap();

    write_file_at(&tenant.pdf_dir, "danfe.pdf", "%PDF", local(2024, 3, 12));

    let bundle = archive_tenant(1, &tenant, march_2024(), &out).unwrap().unwrap();
    assert_eq!(entry_names(&bundle.path), vec!["pdf_1/danfe.pdf".to_string()]);

    let remaining: Vec<String> = fs::read_dir(&out)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(remaining, vec!["tenant_1.zip".to_string()]);
}

#[cfg(unix)]
#[test]
fn test_archive_ignores_dangling_symlink() {
    let tmp = tempdir().unwrap();
    let tenant = tenant_dirs(tmp.path());
    let out = tmp.path().join("out");

    write_file_at(&tenant.xml_dir, "good.xml", "<good/>", local(2024, 3, 8));
    std::os::unix::fs::symlink(tmp.path().join("gone.xml"), tenant.xml_dir.join("stale.xml"))
        .unwrap();

    let bundle = archive_tenant(1, &tenant, march_2024(), &out)
        .expect("dangling link is not an error")
        .expect("good.xml still matches");
    assert_eq!(bundle.xml_files, vec!["good.xml".to_string()]);
    assert_eq!(entry_names(&bundle.path), vec!["xml_1/good.xml".to_string()]);
}
