use std::time::Duration;

use scodoc_patcher::browser::connect_to_browser_and_page;
use scodoc_patcher::config::{Config, ScanProfile};
use scodoc_patcher::infrastructure::{DocumentTree, JsExecutor, MemoryTree, NodeId, PageBridge};
use scodoc_patcher::logger;
use scodoc_patcher::models::{load_snapshot, SnapshotNode};
use scodoc_patcher::orchestrator::{MemoryScanner, MutationScheduler, Scanner, TreeEvent};
use scodoc_patcher::workflow::{ScanCtx, ScanFlow, ScanTrigger};
use tokio::sync::mpsc;

const SUMMARY_ID: &str = "scodoc-patcher-summary";

fn flow() -> ScanFlow {
    ScanFlow::new(&ScanProfile::default()).expect("默认扫描规则应当有效")
}

fn add_ue(tree: &mut MemoryTree, parent: NodeId, class: &str, label: &str) -> NodeId {
    let ue = tree.append_element(parent, "div", &[("class", class)]);
    tree.append_text(ue, label);
    ue
}

fn add_eval(tree: &mut MemoryTree, parent: NodeId, label: &str, coef: &str) {
    let eval = tree.append_element(parent, "div", &[("class", "eval")]);
    tree.append_text(eval, label);
    let span = tree.append_element(eval, "span", &[("class", "coef")]);
    tree.append_text(span, coef);
}

/// 成绩单：UE 1.1 两条评估（12×2、16×1），UE 1.2 一条未出成绩的评估（~×3）
fn releve() -> (MemoryTree, NodeId, NodeId) {
    let mut tree = MemoryTree::from_snapshot(None);
    let body = tree.children(tree.root())[0];
    let host = tree.append_element(body, "releve-but", &[]);
    let shadow = tree.attach_shadow(host);

    let a = add_ue(&mut tree, shadow, "ue", "UE 1.1 ~");
    add_eval(&mut tree, shadow, "Contrôle 12", "Coef. 2");
    add_eval(&mut tree, shadow, "Examen 16", "Coef. 1");
    let b = add_ue(&mut tree, shadow, "ue", "UE 1.2 ~");
    add_eval(&mut tree, shadow, "Projet ~", "Coef. 3");

    (tree, a, b)
}

fn summary_text(tree: &MemoryTree) -> Option<String> {
    tree.element_by_id(SUMMARY_ID)
        .map(|n| tree.text_content(n).trim().to_string())
}

#[test]
fn test_scan_patches_groups_and_renders_summary() {
    let (mut tree, a, b) = releve();
    let flow = flow();

    let outcome = flow.run(&mut tree, &ScanCtx::new(1, ScanTrigger::Bootstrap));

    assert_eq!(outcome.groups.len(), 2);
    assert_eq!(outcome.new_patches, 1);
    let average = outcome.groups[0].average.unwrap();
    assert!((average - 40.0 / 3.0).abs() < 1e-9);
    assert_eq!(outcome.groups[1].average, None);

    let overall = outcome.overall.unwrap();
    assert_eq!(overall.counted_groups, 1);
    assert!((overall.average - 40.0 / 3.0).abs() < 1e-9);

    assert_eq!(tree.text_content(a).trim(), "UE 1.1 13.33");
    assert!(tree.attribute(a, "data-scodoc-patched").is_some());
    // 没有平均的 UE 保持原样，也不标记
    assert_eq!(tree.text_content(b).trim(), "UE 1.2 ~");
    assert!(tree.attribute(b, "data-scodoc-patched").is_none());

    assert_eq!(
        summary_text(&tree).as_deref(),
        Some("Moyenne générale : 13.33 (1 UE)")
    );
}

#[test]
fn test_second_scan_is_idempotent() {
    let (mut tree, a, _) = releve();
    let flow = flow();

    flow.run(&mut tree, &ScanCtx::new(1, ScanTrigger::Bootstrap));
    let header_after_first = tree.text_content(a);
    let summary_after_first = summary_text(&tree);

    let second = flow.run(&mut tree, &ScanCtx::new(2, ScanTrigger::Mutation));
    assert_eq!(second.new_patches, 0);
    assert_eq!(tree.text_content(a), header_after_first);
    assert_eq!(summary_text(&tree), summary_after_first);
}

#[test]
fn test_bonus_group_is_excluded() {
    let (mut tree, _, _) = releve();
    let body = tree.children(tree.root())[0];
    let host = tree.children(body)[0];
    let shadow = tree.shadow_root(host).unwrap();
    let bonus = add_ue(&mut tree, shadow, "ue bonus", "UE Bonus ~");
    add_eval(&mut tree, shadow, "Sport 20", "Coef. 1");

    let outcome = flow().run(&mut tree, &ScanCtx::new(1, ScanTrigger::Bootstrap));

    assert!(outcome.groups.iter().all(|g| g.header != bonus));
    assert_eq!(tree.text_content(bonus).trim(), "UE Bonus ~");
    assert_eq!(outcome.overall.unwrap().counted_groups, 1);
}

#[test]
fn test_page_without_host_is_left_alone() {
    let mut tree = MemoryTree::from_snapshot(None);
    let outcome = flow().run(&mut tree, &ScanCtx::new(1, ScanTrigger::Bootstrap));
    assert!(outcome.groups.is_empty());
    assert_eq!(tree.write_count(), 0);
    assert_eq!(summary_text(&tree), None);
}

#[test]
fn test_summary_is_cleared_when_nothing_counts() {
    let (mut tree, _, _) = releve();
    let flow = flow();
    flow.run(&mut tree, &ScanCtx::new(1, ScanTrigger::Bootstrap));
    assert_eq!(
        summary_text(&tree).as_deref(),
        Some("Moyenne générale : 13.33 (1 UE)")
    );

    // 页面重新渲染：只剩一个全是 ~ 的 UE，总平均节点还是上次的内容
    let mut fresh = MemoryTree::from_snapshot(None);
    let fresh_body = fresh.children(fresh.root())[0];
    let host = fresh.append_element(fresh_body, "releve-but", &[]);
    let shadow = fresh.attach_shadow(host);
    add_ue(&mut fresh, shadow, "ue", "UE 1.2 ~");
    add_eval(&mut fresh, shadow, "Projet ~", "Coef. 3");
    let summary = fresh.append_element(fresh_body, "div", &[("id", SUMMARY_ID)]);
    fresh.append_text(summary, "Moyenne générale : 13.33 (1 UE)");

    let outcome = flow.run(&mut fresh, &ScanCtx::new(2, ScanTrigger::Mutation));
    assert_eq!(outcome.groups.len(), 1);
    assert_eq!(outcome.overall, None);
    assert_eq!(
        summary_text(&fresh).as_deref(),
        Some("Moyenne générale : - (0 UE)")
    );
}

#[test]
fn test_numeric_coefficient_cell() {
    let mut tree = MemoryTree::from_snapshot(None);
    let body = tree.children(tree.root())[0];
    let host = tree.append_element(body, "releve-but", &[]);
    let ue = add_ue(&mut tree, host, "ue", "UE 3.1 ~");
    add_eval(&mut tree, host, "DS 12 ", "2");
    add_eval(&mut tree, host, "TP 2 ", "2");

    let outcome = flow().run(&mut tree, &ScanCtx::new(1, ScanTrigger::Bootstrap));
    let records = &outcome.groups[0].records;
    assert_eq!(records[0].note, Some(12.0));
    assert_eq!(records[0].coefficient, 2);
    assert_eq!(records[1].note, Some(2.0));
    assert_eq!(tree.text_content(ue).trim(), "UE 3.1 7.00");
}

#[tokio::test(start_paused = true)]
async fn test_own_writes_do_not_loop() {
    let (tree, a, _) = releve();
    let (tx, rx) = mpsc::channel(16);
    let mut scanner = MemoryScanner::new(tree, flow()).with_feedback(tx);
    let mut scheduler = MutationScheduler::new(Duration::from_millis(500), Duration::from_millis(1000));

    // 扫描者持有发送端，通道不会关闭；给足时间后由超时结束
    let result = tokio::time::timeout(Duration::from_secs(30), scheduler.run(rx, &mut scanner)).await;
    assert!(result.is_err());

    // 启动扫描修补了 UE 1.1 并回送一次事件，随后的扫描没有新修补，不再回送
    assert_eq!(scheduler.scans(), 2);
    let outcomes = scanner.outcomes();
    assert_eq!(outcomes[0].new_patches, 1);
    assert_eq!(outcomes[1].new_patches, 0);
    assert_eq!(scanner.tree().text_content(a).trim(), "UE 1.1 13.33");
}

#[tokio::test(start_paused = true)]
async fn test_mutation_burst_is_coalesced() {
    let (tree, _, _) = releve();
    let (tx, rx) = mpsc::channel(16);
    let mut scanner = MemoryScanner::new(tree, flow());
    let mut scheduler = MutationScheduler::new(Duration::from_millis(500), Duration::from_millis(1000));

    let producer = tokio::spawn(async move {
        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = tx.send(TreeEvent).await;
        }
        tokio::time::sleep(Duration::from_secs(3)).await;
    });

    let scans = scheduler.run(rx, &mut scanner).await;
    producer.await.unwrap();

    // 启动定时器被连续的变化推迟，最终只扫描一次
    assert_eq!(scans, 1);
    assert_eq!(scanner.outcomes()[0].new_patches, 1);
}

#[tokio::test(start_paused = true)]
async fn test_pending_scan_runs_when_channel_closes() {
    let (tree, _, _) = releve();
    let (tx, rx) = mpsc::channel(16);
    tx.send(TreeEvent).await.unwrap();
    drop(tx);

    let mut scanner = MemoryScanner::new(tree, flow());
    let mut scheduler = MutationScheduler::new(Duration::from_millis(500), Duration::from_millis(1000));

    assert_eq!(scheduler.run(rx, &mut scanner).await, 1);
    assert!(scanner.outcomes()[0].overall.is_some());
}

#[tokio::test]
async fn test_offline_snapshot_scan() {
    let host = SnapshotNode::element("releve-but", &[], vec![]).with_shadow(vec![
        SnapshotNode::element("div", &[("class", "ue")], vec![SnapshotNode::text("UE 2.1 ~")]),
        SnapshotNode::element(
            "div",
            &[("class", "eval")],
            vec![
                SnapshotNode::text("TP 8,5"),
                SnapshotNode::element("span", &[("class", "coef")], vec![SnapshotNode::text("Coef. 2")]),
            ],
        ),
    ]);
    let json = serde_json::json!({ "host": host }).to_string();
    let path = std::env::temp_dir().join(format!("scodoc_patcher_snapshot_{}.json", std::process::id()));
    tokio::fs::write(&path, json).await.unwrap();

    let snapshot = load_snapshot(&path).await.unwrap();
    let _ = tokio::fs::remove_file(&path).await;

    let tree = MemoryTree::from_snapshot(snapshot.host.as_ref());
    let mut scanner = MemoryScanner::new(tree, flow());
    let outcome = scanner
        .scan(ScanCtx::new(1, ScanTrigger::Snapshot))
        .await
        .unwrap();

    assert_eq!(outcome.new_patches, 1);
    let overall = outcome.overall.unwrap();
    assert!((overall.average - 8.5).abs() < 1e-9);
    assert_eq!(
        summary_text(scanner.tree()).as_deref(),
        Some("Moyenne générale : 8.50 (1 UE)")
    );
}

#[tokio::test]
async fn test_missing_snapshot_file_is_error() {
    let path = std::env::temp_dir().join("scodoc_patcher_no_such_snapshot.json");
    assert!(load_snapshot(&path).await.is_err());
}

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_browser_connection() {
    // 初始化日志
    logger::init();

    // 加载配置
    let config = Config::from_env();

    // 测试浏览器连接
    let result = connect_to_browser_and_page(
        config.browser_debug_port,
        Some(&config.target_url),
        Some(&config.target_title),
    )
    .await;

    assert!(result.is_ok(), "应该能够成功连接浏览器");
}

#[tokio::test]
#[ignore]
async fn test_live_page_snapshot() {
    logger::init();

    let config = Config::from_env();
    let profile = config.load_profile().expect("加载扫描规则失败");
    let (_browser, page) = connect_to_browser_and_page(
        config.browser_debug_port,
        Some(&config.target_url),
        Some(&config.target_title),
    )
    .await
    .expect("连接浏览器失败");

    let bridge = PageBridge::new(JsExecutor::new(page), &profile);
    let snapshot = bridge.snapshot().await.expect("读取页面快照失败");
    let tree = MemoryTree::from_snapshot(snapshot.host.as_ref());

    let groups = flow().collect_groups(&tree);
    println!("找到 {} 个 UE", groups.len());
}
